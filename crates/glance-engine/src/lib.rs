//! glance-engine — async frame pipeline around [`glance_core`].
//!
//! Wires the identity tracking engine to its external collaborators:
//! frames arrive from a single producer with keep-latest-only
//! backpressure, embeddings come from a pluggable extractor, and
//! consumers observe immutable per-frame snapshots plus a low-frequency
//! login-confirmed event stream.

pub mod config;
pub mod engine;
pub mod extractor;
pub mod geometry;

pub use config::EngineConfig;
pub use engine::{spawn_engine, Detection, EngineError, EngineHandle, FramePayload, FrameSnapshot};
pub use extractor::{EmbeddingExtractor, ExtractError, FaceCrop};
