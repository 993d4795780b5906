//! Seam for the external embedding model.

use std::future::Future;

use glance_core::Embedding;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("unsupported crop: {0}")]
    UnsupportedCrop(String),
}

/// Opaque face crop as delivered by the detector, in source pixel space.
#[derive(Debug, Clone)]
pub struct FaceCrop {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// External embedding model: maps one face crop (plus the frame's
/// rotation) to a fixed-length feature vector, 192 components for the
/// reference model.
///
/// Failures must not crash the pipeline; the engine logs them and drops
/// only the affected detection.
pub trait EmbeddingExtractor: Send + 'static {
    fn extract(
        &mut self,
        crop: &FaceCrop,
        rotation_degrees: i32,
    ) -> impl Future<Output = Result<Embedding, ExtractError>> + Send;
}
