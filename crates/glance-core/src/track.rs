//! Live track table with TTL eviction and streak decay.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::types::{Embedding, Rect};

/// Per-track live state for one detector-assigned tracking id.
///
/// Owned exclusively by the [`TrackTable`]; consumers only ever see
/// immutable [`TrackedFace`](crate::types::TrackedFace) snapshots.
#[derive(Debug, Clone)]
pub struct Track {
    pub tracking_id: u32,
    /// Bound identity, by id. Never an owned copy of the registry record.
    pub identity_id: Option<u32>,
    pub last_seen_at: Instant,
    /// Last time a similarity score cleared the match threshold.
    pub last_positive_at: Instant,
    /// Consecutive-positive-match counter. Floored at zero.
    pub streak: u32,
    pub bounding_box: Rect,
    pub embedding: Embedding,
    /// Set once a login confirmation has fired for the current streak.
    pub login_fired: bool,
    /// Set by the matcher when this frame scored a positive match;
    /// cleared by the sweep.
    pub(crate) matched_this_frame: bool,
}

/// Ephemeral map from tracking id to live track state.
///
/// Tracking ids are unique within the table at any instant. Tracks idle
/// past the TTL are removed deterministically by [`sweep`](Self::sweep);
/// no track lingers unbounded.
#[derive(Debug)]
pub struct TrackTable {
    tracks: HashMap<u32, Track>,
    idle_ttl: Duration,
}

impl TrackTable {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            tracks: HashMap::new(),
            idle_ttl,
        }
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }

    /// Fetch the track for `tracking_id`, creating an unbound one the
    /// first time the id is reported. Reappearances refresh the latest
    /// bounding box and embedding; last-seen is left to the matcher,
    /// which refreshes it only on paths that should keep the track alive.
    pub fn upsert(
        &mut self,
        tracking_id: u32,
        bounding_box: Rect,
        embedding: Embedding,
        now: Instant,
    ) -> &mut Track {
        self.tracks
            .entry(tracking_id)
            .and_modify(|t| {
                t.bounding_box = bounding_box;
                t.embedding = embedding.clone();
            })
            .or_insert_with(|| {
                tracing::debug!(tracking_id, "new track");
                Track {
                    tracking_id,
                    identity_id: None,
                    last_seen_at: now,
                    last_positive_at: now,
                    streak: 0,
                    bounding_box,
                    embedding,
                    login_fired: false,
                    matched_this_frame: false,
                }
            })
    }

    pub fn get(&self, tracking_id: u32) -> Option<&Track> {
        self.tracks.get(&tracking_id)
    }

    pub fn get_mut(&mut self, tracking_id: u32) -> Option<&mut Track> {
        self.tracks.get_mut(&tracking_id)
    }

    pub fn contains(&self, tracking_id: u32) -> bool {
        self.tracks.contains_key(&tracking_id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Track> {
        self.tracks.values_mut()
    }

    /// Per-frame maintenance, run once after matching: evict every track
    /// idle strictly past the TTL, then decay the streak of every
    /// surviving track that saw no positive match this frame.
    pub fn sweep(&mut self, now: Instant) {
        self.tracks.retain(|tracking_id, track| {
            let idle = now.saturating_duration_since(track.last_seen_at);
            if idle > self.idle_ttl {
                tracing::debug!(
                    tracking_id,
                    idle_ms = idle.as_millis() as u64,
                    "evicting idle track"
                );
                false
            } else {
                true
            }
        });

        for track in self.tracks.values_mut() {
            if !track.matched_this_frame {
                track.streak = track.streak.saturating_sub(1);
            }
            track.matched_this_frame = false;
        }
    }
}
