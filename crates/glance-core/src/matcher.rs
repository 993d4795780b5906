//! Per-detection identity resolution.
//!
//! Resolves one observed face to an enrolled identity, consulting the
//! track table first (bound-track path) and falling back to a full
//! registry scan (unbound path). Cost of the fallback is
//! O(identities x references) per detection; acceptable for registries
//! of tens of identities, and the scaling ceiling of this design.

use std::time::{Duration, Instant};

use crate::registry::IdentityRegistry;
use crate::similarity::{Cosine, SimilarityMetric};
use crate::track::{Track, TrackTable};
use crate::types::ObservedFace;

/// Matching policy knobs. The threshold is calibrated to the configured
/// metric's scale (0.8 on the cosine scale).
#[derive(Debug, Clone, Copy)]
pub struct MatchPolicy {
    /// Minimum similarity score for a positive match.
    pub threshold: f32,
    /// Streak increment per positively-matched frame.
    pub streak_step: u32,
    /// How long a bound track may go without a positive score before
    /// its identity is unbound. Equal to the table's idle TTL.
    pub unbind_grace: Duration,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            streak_step: 2,
            unbind_grace: Duration::from_millis(1000),
        }
    }
}

/// Resolves observed faces to identities, mutating only the track table.
pub struct Matcher {
    metric: Box<dyn SimilarityMetric>,
    policy: MatchPolicy,
}

impl Matcher {
    pub fn new(metric: Box<dyn SimilarityMetric>, policy: MatchPolicy) -> Self {
        Self { metric, policy }
    }

    /// Cosine metric with the canonical policy.
    pub fn with_defaults() -> Self {
        Self::new(Box::new(Cosine), MatchPolicy::default())
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    /// Resolve one detection, updating its track in place. Never mutates
    /// the registry.
    pub fn resolve(
        &self,
        table: &mut TrackTable,
        registry: &IdentityRegistry,
        face: &ObservedFace,
        now: Instant,
    ) {
        let track = table.upsert(
            face.tracking_id,
            face.bounding_box,
            face.embedding.clone(),
            now,
        );

        match track.identity_id {
            Some(identity_id) => self.rescore_bound(track, registry, identity_id, now),
            None => self.search_registry(track, registry, now),
        }
    }

    /// Bound-track path: score the fresh embedding against every
    /// reference of the already-bound identity.
    fn rescore_bound(
        &self,
        track: &mut Track,
        registry: &IdentityRegistry,
        identity_id: u32,
        now: Instant,
    ) {
        let Some(identity) = registry.get(identity_id) else {
            // Identities are never deleted, but a stale binding must not
            // keep the track resolved.
            tracing::warn!(
                tracking_id = track.tracking_id,
                identity_id,
                "bound identity missing from registry; unbinding"
            );
            unbind(track);
            return;
        };

        let positive = identity
            .embeddings
            .iter()
            .any(|reference| self.metric.score(reference, &track.embedding) >= self.policy.threshold);

        if positive {
            track.streak = track.streak.saturating_add(self.policy.streak_step);
            track.last_seen_at = now;
            track.last_positive_at = now;
            track.matched_this_frame = true;
        } else if now.saturating_duration_since(track.last_positive_at) > self.policy.unbind_grace {
            tracing::debug!(
                tracking_id = track.tracking_id,
                identity_id,
                "no positive score within grace period; unbinding"
            );
            unbind(track);
        }
        // Negative within grace: last-seen is deliberately not refreshed,
        // so the track decays toward eviction unless scores recover.
    }

    /// Unbound path: scan the whole registry for the best reference at
    /// or above the threshold. Strictly greater score wins; exact ties
    /// keep the earliest-enrolled identity.
    fn search_registry(&self, track: &mut Track, registry: &IdentityRegistry, now: Instant) {
        // The face is visibly present even if it stays unknown.
        track.last_seen_at = now;

        let mut best: Option<(u32, f32)> = None;
        for identity in registry.iter() {
            for reference in &identity.embeddings {
                let score = self.metric.score(reference, &track.embedding);
                if score < self.policy.threshold {
                    continue;
                }
                if best.map_or(true, |(_, best_score)| score > best_score) {
                    best = Some((identity.id, score));
                }
            }
        }

        if let Some((identity_id, score)) = best {
            tracing::debug!(
                tracking_id = track.tracking_id,
                identity_id,
                score,
                "bound track to identity"
            );
            track.identity_id = Some(identity_id);
            track.streak = track.streak.saturating_add(self.policy.streak_step);
            track.last_positive_at = now;
            track.matched_this_frame = true;
        }
    }
}

fn unbind(track: &mut Track) {
    track.identity_id = None;
    track.streak = 0;
    track.login_fired = false;
}
