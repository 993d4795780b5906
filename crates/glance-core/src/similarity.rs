//! Embedding similarity metrics.
//!
//! All metrics score higher for more alike vectors and return
//! [`max_score`](SimilarityMetric::max_score) for identical input. The match
//! threshold is calibrated against a single metric's scale, so one deployment
//! must use one metric for every comparison it makes.

use crate::types::Embedding;

/// Strategy for scoring two embeddings of equal dimensionality for likeness.
pub trait SimilarityMetric: Send + Sync {
    /// Score two embeddings. Higher = more alike.
    fn score(&self, a: &Embedding, b: &Embedding) -> f32;

    /// The score this metric assigns to two identical embeddings.
    fn max_score(&self) -> f32;
}

/// Cosine similarity in [-1, 1]: dot product over the product of norms.
///
/// The default metric. Returns 0.0 when either vector has zero norm.
pub struct Cosine;

impl SimilarityMetric for Cosine {
    fn score(&self, a: &Embedding, b: &Embedding) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (x, y) in a.values.iter().zip(b.values.iter()) {
            dot += x * y;
            norm_a += x * x;
            norm_b += y * y;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 {
            dot / denom
        } else {
            0.0
        }
    }

    fn max_score(&self) -> f32 {
        1.0
    }
}

/// Euclidean distance on unit-normalized vectors, mapped into [0, 1].
///
/// Alternative strategy; not the default. Returns 0.0 on dimension mismatch.
pub struct NormalizedEuclidean;

impl SimilarityMetric for NormalizedEuclidean {
    fn score(&self, a: &Embedding, b: &Embedding) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let na = unit_normalize(&a.values);
        let nb = unit_normalize(&b.values);

        let dist_sq: f32 = na
            .iter()
            .zip(nb.iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum();

        // Unit vectors are at most 2 apart per axis pair, so the distance
        // is bounded by sqrt(4n).
        1.0 - (dist_sq.sqrt() / (4.0 * a.len() as f32).sqrt())
    }

    fn max_score(&self) -> f32 {
        1.0
    }
}

/// Manhattan distance mapped into [0, 1].
///
/// Alternative strategy; not the default. Returns 0.0 on dimension mismatch.
pub struct NormalizedManhattan;

impl SimilarityMetric for NormalizedManhattan {
    fn score(&self, a: &Embedding, b: &Embedding) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dist: f32 = a
            .values
            .iter()
            .zip(b.values.iter())
            .map(|(x, y)| (x - y).abs())
            .sum();

        1.0 - (dist / (a.len() as f32 * 2.0))
    }

    fn max_score(&self) -> f32 {
        1.0
    }
}

fn unit_normalize(values: &[f32]) -> Vec<f32> {
    let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        values.iter().map(|v| v / norm).collect()
    } else {
        values.to_vec()
    }
}
