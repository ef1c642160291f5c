//! Core data model: bounding boxes and per-frame object observations.

use std::fmt;

/// Axis-aligned bounding box in pixel coordinates.
///
/// Stored in MOT convention: top-left corner plus extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Create a bounding box from its top-left corner and extent.
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// X coordinate of the right edge.
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Y coordinate of the bottom edge.
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Box area in square pixels.
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Intersection-over-union with another box.
    ///
    /// Returns 0.0 for disjoint boxes and whenever the union has no area,
    /// so the result is always finite and inside [0, 1].
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let inter_x1 = self.left.max(other.left);
        let inter_y1 = self.top.max(other.top);
        let inter_x2 = self.right().min(other.right());
        let inter_y2 = self.bottom().min(other.bottom());

        let inter_w = (inter_x2 - inter_x1).max(0.0);
        let inter_h = (inter_y2 - inter_y1).max(0.0);
        let inter_area = inter_w * inter_h;

        let union_area = self.area() + other.area() - inter_area;
        if union_area > 0.0 {
            inter_area / union_area
        } else {
            0.0
        }
    }
}

/// Which side of the evaluation an observation belongs to.
///
/// Identities are local to their source; a ground-truth identity and a
/// predicted identity are never compared directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    GroundTruth,
    Predicted,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::GroundTruth => write!(f, "ground truth"),
            Source::Predicted => write!(f, "predictions"),
        }
    }
}

/// One annotated or detected object instance in one frame.
#[derive(Debug, Clone)]
pub struct Observation {
    /// Frame index, 1-based, after any window remapping.
    pub frame: u32,
    /// Track identity, unique within its source for a given frame.
    pub identity: i64,
    pub bbox: BoundingBox,
    /// Object class; observations of different classes never match.
    pub class_id: u32,
    /// Detector confidence in [0, 1]; 1.0 for ground truth.
    pub confidence: f64,
    /// Annotated visibility in [0, 1]; carried through but unused by matching.
    pub visibility: f64,
    pub source: Source,
}

impl Observation {
    /// Create an observation with full confidence and visibility.
    pub fn new(frame: u32, identity: i64, bbox: BoundingBox, class_id: u32, source: Source) -> Self {
        Self {
            frame,
            identity,
            bbox,
            class_id,
            confidence: 1.0,
            visibility: 1.0,
            source,
        }
    }
}
