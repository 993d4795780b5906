use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }
}

/// Face embedding vector (192-dimensional for the reference model).
///
/// Produced by an external embedding model; treated as an opaque
/// fixed-length feature vector here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One detected face after embedding extraction, ready for identity
/// resolution. The bounding box is already mapped to screen space.
#[derive(Debug, Clone)]
pub struct ObservedFace {
    pub tracking_id: u32,
    pub bounding_box: Rect,
    pub embedding: Embedding,
}

/// Immutable per-frame snapshot of one live track, safe to hand to a UI
/// layer. Carries no reference into the track table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedFace {
    pub tracking_id: u32,
    pub bounding_box: Rect,
    /// Bound identity, if the track has been resolved.
    pub identity_id: Option<u32>,
    /// Display name of the bound identity.
    pub name: Option<String>,
    pub embedding: Embedding,
    /// Consecutive-positive-match counter gating login.
    pub streak: u32,
}

/// One-shot event emitted when a track's match streak first reaches the
/// login threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginConfirmation {
    pub tracking_id: u32,
    pub identity_id: u32,
    pub name: String,
}

/// Everything one processed frame produced: the resolved track list in
/// detection order, plus any login confirmations.
#[derive(Debug, Clone, Default)]
pub struct FrameResolution {
    pub tracks: Vec<TrackedFace>,
    pub logins: Vec<LoginConfirmation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let r = Rect::new(10, 20, 100, 50);
        assert_eq!(r.right(), 110);
        assert_eq!(r.bottom(), 70);
    }

    #[test]
    fn test_tracked_face_wire_shape() {
        // The snapshot row is the UI contract; field names must stay stable.
        let face = TrackedFace {
            tracking_id: 7,
            bounding_box: Rect::new(0, 0, 10, 10),
            identity_id: Some(42),
            name: Some("Ada".into()),
            embedding: Embedding::new(vec![1.0, 0.0]),
            streak: 4,
        };
        let json = serde_json::to_value(&face).unwrap();
        assert_eq!(json["tracking_id"], 7);
        assert_eq!(json["identity_id"], 42);
        assert_eq!(json["name"], "Ada");
        assert_eq!(json["bounding_box"]["width"], 10);
        assert_eq!(json["streak"], 4);
    }
}
