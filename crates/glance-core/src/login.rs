//! One-shot login confirmation gating.

use crate::registry::IdentityRegistry;
use crate::track::TrackTable;
use crate::types::LoginConfirmation;

/// Watches per-track match streaks and fires exactly one confirmation
/// when a bound track first reaches the login threshold.
///
/// The gate re-arms when the streak falls back below the threshold, so a
/// person who walks away and returns confirms again.
pub struct LoginGate {
    threshold: u32,
}

impl LoginGate {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    /// Scan the table after the eviction sweep and collect confirmations.
    pub fn scan(
        &self,
        table: &mut TrackTable,
        registry: &IdentityRegistry,
    ) -> Vec<LoginConfirmation> {
        let mut confirmations = Vec::new();

        for track in table.iter_mut() {
            if track.streak < self.threshold {
                track.login_fired = false;
                continue;
            }
            if track.login_fired {
                continue;
            }
            let Some(identity_id) = track.identity_id else {
                continue;
            };
            let Some(identity) = registry.get(identity_id) else {
                continue;
            };

            track.login_fired = true;
            tracing::info!(
                tracking_id = track.tracking_id,
                identity_id,
                name = %identity.name,
                streak = track.streak,
                "login confirmed"
            );
            confirmations.push(LoginConfirmation {
                tracking_id: track.tracking_id,
                identity_id,
                name: identity.name.clone(),
            });
        }

        confirmations
    }
}
