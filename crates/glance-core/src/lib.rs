//! glance-core — identity tracking & matching engine.
//!
//! Resolves per-frame face detections (a transient tracking id, bounding
//! box, and externally-computed embedding) against enrolled identities,
//! maintains short-lived per-track state with TTL eviction, and gates
//! hands-free login on sustained match streaks.

pub mod login;
pub mod matcher;
pub mod registry;
pub mod similarity;
pub mod track;
pub mod tracker;
pub mod types;

pub use registry::{EnrollError, EnrollOutcome, Identity, IdentityRegistry};
pub use similarity::{Cosine, NormalizedEuclidean, NormalizedManhattan, SimilarityMetric};
pub use tracker::{IdentityTracker, TrackerConfig};
pub use types::{
    Embedding, FrameResolution, LoginConfirmation, ObservedFace, Rect, TrackedFace,
};
