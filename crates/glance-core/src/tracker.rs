//! Frame-by-frame identity tracking facade.
//!
//! Owns the registry, track table, matcher, and login gate, and is the
//! single logical writer over all of them. Callers feed it one frame of
//! observed faces at a time and receive immutable snapshots back.

use std::time::{Duration, Instant};

use crate::login::LoginGate;
use crate::matcher::{MatchPolicy, Matcher};
use crate::registry::{EnrollError, EnrollOutcome, IdentityRegistry};
use crate::similarity::SimilarityMetric;
use crate::track::TrackTable;
use crate::types::{Embedding, FrameResolution, ObservedFace, TrackedFace};

/// Canonical engine policy. One deployment uses one metric and one set
/// of thresholds; the alternatives are deliberate rejections, not knobs
/// to mix at runtime.
#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    pub similarity_threshold: f32,
    pub streak_step: u32,
    pub idle_ttl: Duration,
    pub login_streak: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            streak_step: 2,
            idle_ttl: Duration::from_millis(1000),
            login_streak: 10,
        }
    }
}

/// The identity tracking & matching engine.
pub struct IdentityTracker {
    registry: IdentityRegistry,
    tracks: TrackTable,
    matcher: Matcher,
    gate: LoginGate,
}

impl IdentityTracker {
    /// Engine with the default cosine metric.
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_metric(config, Box::new(crate::similarity::Cosine))
    }

    /// Engine with a swapped-in similarity metric. The threshold in
    /// `config` must be calibrated to that metric's scale.
    pub fn with_metric(config: TrackerConfig, metric: Box<dyn SimilarityMetric>) -> Self {
        let policy = MatchPolicy {
            threshold: config.similarity_threshold,
            streak_step: config.streak_step,
            unbind_grace: config.idle_ttl,
        };
        Self {
            registry: IdentityRegistry::new(),
            tracks: TrackTable::new(config.idle_ttl),
            matcher: Matcher::new(metric, policy),
            gate: LoginGate::new(config.login_streak),
        }
    }

    /// Process one frame: resolve every observed face, run the eviction
    /// sweep, then the login scan. Returns the resolved track list in
    /// detection order plus any login confirmations.
    pub fn observe_frame(&mut self, faces: &[ObservedFace], now: Instant) -> FrameResolution {
        for face in faces {
            self.matcher
                .resolve(&mut self.tracks, &self.registry, face, now);
        }

        self.tracks.sweep(now);
        let logins = self.gate.scan(&mut self.tracks, &self.registry);

        let tracks = faces
            .iter()
            .filter_map(|face| self.tracks.get(face.tracking_id))
            .map(|track| {
                let name = track
                    .identity_id
                    .and_then(|id| self.registry.get(id))
                    .map(|identity| identity.name.clone());
                TrackedFace {
                    tracking_id: track.tracking_id,
                    bounding_box: track.bounding_box,
                    identity_id: track.identity_id,
                    name,
                    embedding: track.embedding.clone(),
                    streak: track.streak,
                }
            })
            .collect();

        FrameResolution { tracks, logins }
    }

    /// Enroll or merge an identity, then immediately bind the operator's
    /// selected track to it (if that track is still live).
    pub fn enroll(
        &mut self,
        name: &str,
        identity_id: u32,
        embedding: Embedding,
        tracking_id: u32,
        now: Instant,
    ) -> Result<EnrollOutcome, EnrollError> {
        let outcome = self.registry.enroll(name, identity_id, embedding)?;

        if let Some(track) = self.tracks.get_mut(tracking_id) {
            track.identity_id = Some(identity_id);
            // Restart the grace window so the fresh binding is not
            // unbound before the next positive score.
            track.last_positive_at = now;
            tracing::info!(tracking_id, identity_id, "bound enrolling track");
        }

        Ok(outcome)
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::{Cosine, SimilarityMetric};
    use crate::types::Rect;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const FRAME: Duration = Duration::from_millis(33);

    fn emb(values: &[f32]) -> Embedding {
        Embedding::new(values.to_vec())
    }

    fn face(tracking_id: u32, values: &[f32]) -> ObservedFace {
        ObservedFace {
            tracking_id,
            bounding_box: Rect::new(0, 0, 10, 10),
            embedding: emb(values),
        }
    }

    fn reference_vector() -> Vec<f32> {
        // Unit-ish 8-dim stand-in for the 192-dim production embedding.
        vec![0.5, -0.2, 0.1, 0.7, 0.0, -0.3, 0.2, 0.1]
    }

    /// Scenario A: identity enrolled with V, trackingId 7 reports an
    /// embedding identical to V for 5 consecutive frames. Streak steps
    /// by 2 per frame, so login confirms on the 5th frame.
    #[test]
    fn test_sustained_match_confirms_login_on_fifth_frame() {
        let mut tracker = IdentityTracker::new(TrackerConfig::default());
        let v = reference_vector();
        tracker.registry.enroll("Ada", 1, emb(&v)).unwrap();

        let t0 = Instant::now();
        for frame in 0..4 {
            let result = tracker.observe_frame(&[face(7, &v)], t0 + FRAME * frame);
            assert!(result.logins.is_empty(), "fired early on frame {frame}");
        }

        let result = tracker.observe_frame(&[face(7, &v)], t0 + FRAME * 4);
        assert_eq!(result.logins.len(), 1);
        assert_eq!(result.logins[0].identity_id, 1);
        assert_eq!(result.logins[0].tracking_id, 7);
        assert_eq!(result.tracks[0].identity_id, Some(1));
        assert_eq!(result.tracks[0].name.as_deref(), Some("Ada"));
    }

    /// Continuation of scenario A: the streak staying at/above the
    /// threshold must not re-fire.
    #[test]
    fn test_login_fires_exactly_once_per_streak() {
        let mut tracker = IdentityTracker::new(TrackerConfig::default());
        let v = reference_vector();
        tracker.registry.enroll("Ada", 1, emb(&v)).unwrap();

        let t0 = Instant::now();
        let mut total_logins = 0;
        for frame in 0..12 {
            let result = tracker.observe_frame(&[face(7, &v)], t0 + FRAME * frame);
            total_logins += result.logins.len();
        }
        assert_eq!(total_logins, 1);
    }

    /// Scenario B: a random embedding scoring below threshold against
    /// every enrolled identity stays unknown across 20 frames.
    #[test]
    fn test_unrelated_face_stays_unknown() {
        let mut tracker = IdentityTracker::new(TrackerConfig::default());
        let v = reference_vector();
        tracker.registry.enroll("Ada", 1, emb(&v)).unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        let mut noise: Vec<f32> = (0..8).map(|_| rng.gen_range(-1.0..1.0)).collect();
        // A negated probe can never score above a positive threshold.
        if Cosine.score(&emb(&noise), &emb(&v)) >= 0.8 {
            for x in &mut noise {
                *x = -*x;
            }
        }

        let t0 = Instant::now();
        for frame in 0..20 {
            let result = tracker.observe_frame(&[face(9, &noise)], t0 + FRAME * frame);
            assert_eq!(result.tracks.len(), 1);
            assert!(result.tracks[0].identity_id.is_none(), "bound on frame {frame}");
            assert!(result.logins.is_empty());
        }
    }

    /// Scenario C: a bound track absent for 1500 ms (TTL 1000 ms) is
    /// evicted, and a reappearance of the same tracking id is a brand-new
    /// unbound track until it re-matches.
    #[test]
    fn test_absent_track_evicted_and_reappears_fresh() {
        let mut tracker = IdentityTracker::new(TrackerConfig::default());
        let v = reference_vector();
        tracker.registry.enroll("Ada", 1, emb(&v)).unwrap();

        let t0 = Instant::now();
        tracker.observe_frame(&[face(7, &v)], t0);
        assert_eq!(tracker.track_count(), 1);

        // Empty frame 1500 ms later: sweep must drop the track.
        let t1 = t0 + Duration::from_millis(1500);
        let result = tracker.observe_frame(&[], t1);
        assert_eq!(tracker.track_count(), 0);
        assert!(result.tracks.is_empty());

        // Same id reappears: fresh track, streak restarts from the bind step.
        let t2 = t1 + FRAME;
        let result = tracker.observe_frame(&[face(7, &v)], t2);
        assert_eq!(result.tracks[0].streak, 2);
        assert_eq!(result.tracks[0].identity_id, Some(1));
    }

    #[test]
    fn test_login_rearms_after_streak_collapse() {
        let mut tracker = IdentityTracker::new(TrackerConfig::default());
        let v = reference_vector();
        tracker.registry.enroll("Ada", 1, emb(&v)).unwrap();

        let t0 = Instant::now();
        let mut now = t0;
        let mut logins = 0;
        for _ in 0..6 {
            logins += tracker.observe_frame(&[face(7, &v)], now).logins.len();
            now += FRAME;
        }
        assert_eq!(logins, 1);

        // Track goes absent long enough to be evicted, then returns.
        now += Duration::from_millis(1500);
        tracker.observe_frame(&[], now);

        let mut second = 0;
        for _ in 0..6 {
            now += FRAME;
            second += tracker.observe_frame(&[face(7, &v)], now).logins.len();
        }
        assert_eq!(second, 1, "return after eviction should confirm again");
    }

    #[test]
    fn test_enroll_binds_live_track() {
        let mut tracker = IdentityTracker::new(TrackerConfig::default());
        let v = reference_vector();

        // Unknown face appears first; operator enrolls it mid-session.
        let t0 = Instant::now();
        let result = tracker.observe_frame(&[face(7, &v)], t0);
        assert!(result.tracks[0].identity_id.is_none());

        let outcome = tracker
            .enroll("Ada", 1, emb(&v), 7, t0 + FRAME)
            .unwrap();
        assert_eq!(outcome, EnrollOutcome::Created);

        let result = tracker.observe_frame(&[face(7, &v)], t0 + FRAME * 2);
        assert_eq!(result.tracks[0].identity_id, Some(1));
    }

    #[test]
    fn test_enroll_merge_through_facade() {
        let mut tracker = IdentityTracker::new(TrackerConfig::default());
        let t0 = Instant::now();
        tracker.enroll("Ada", 1, emb(&[1.0, 0.0]), 7, t0).unwrap();
        let outcome = tracker.enroll("Ada", 1, emb(&[0.0, 1.0]), 7, t0).unwrap();
        assert_eq!(outcome, EnrollOutcome::Merged);
        assert_eq!(tracker.registry().get(1).unwrap().embeddings.len(), 2);
    }

    #[test]
    fn test_invalid_enrollment_leaves_state_untouched() {
        let mut tracker = IdentityTracker::new(TrackerConfig::default());
        let err = tracker
            .enroll("", 1, emb(&[1.0]), 7, Instant::now())
            .unwrap_err();
        assert_eq!(err, EnrollError::EmptyName);
        assert!(tracker.registry().is_empty());
    }

    #[test]
    fn test_flicker_decays_streak_instead_of_accumulating() {
        let mut tracker = IdentityTracker::new(TrackerConfig::default());
        let v = reference_vector();
        tracker.registry.enroll("Ada", 1, emb(&v)).unwrap();

        let t0 = Instant::now();
        // Two positive frames: streak 4.
        tracker.observe_frame(&[face(7, &v)], t0);
        tracker.observe_frame(&[face(7, &v)], t0 + FRAME);

        // Face flickers out for three frames (still within TTL).
        for frame in 2..5 {
            tracker.observe_frame(&[], t0 + FRAME * frame);
        }

        let result = tracker.observe_frame(&[face(7, &v)], t0 + FRAME * 5);
        // 4 - 3 decay + 2 step = 3.
        assert_eq!(result.tracks[0].streak, 3);
    }

    #[test]
    fn test_snapshot_preserves_detection_order() {
        let mut tracker = IdentityTracker::new(TrackerConfig::default());
        let t0 = Instant::now();
        let frame = [face(9, &[1.0, 0.0]), face(7, &[0.0, 1.0])];
        let result = tracker.observe_frame(&frame, t0);
        let ids: Vec<u32> = result.tracks.iter().map(|t| t.tracking_id).collect();
        assert_eq!(ids, vec![9, 7]);
    }

    #[test]
    fn test_swapped_metric_drives_matching() {
        // Manhattan scale: identical vectors score 1.0, which clears 0.8.
        let config = TrackerConfig::default();
        let metric: Box<dyn SimilarityMetric> = Box::new(crate::similarity::NormalizedManhattan);
        let mut tracker = IdentityTracker::with_metric(config, metric);
        let v = reference_vector();
        tracker.registry.enroll("Ada", 1, emb(&v)).unwrap();

        let result = tracker.observe_frame(&[face(7, &v)], Instant::now());
        assert_eq!(result.tracks[0].identity_id, Some(1));
    }
}
