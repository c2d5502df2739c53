/// One classified region returned by the classification service.
///
/// Coordinates are integer pixels of a center-anchored box.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub class: String,
    /// Always within [0, 1].
    pub confidence: f32,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Detection {
    /// Corner form of the box. Half extents use floor division; corners
    /// saturate at the `i32` range.
    pub fn bounding_box(&self) -> BoundingBox {
        let half_w = self.width.div_euclid(2);
        let half_h = self.height.div_euclid(2);
        BoundingBox {
            left: self.x.saturating_sub(half_w),
            top: self.y.saturating_sub(half_h),
            right: self.x.saturating_add(half_w),
            bottom: self.y.saturating_add(half_h),
        }
    }

    /// Overlay caption, e.g. `plastic (0.92)`.
    pub fn caption(&self) -> String {
        format!("{} ({:.2})", self.class, self.confidence)
    }
}

/// Box corners in pixel coordinates. May extend past the frame edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl BoundingBox {
    pub fn top_left(&self) -> (i32, i32) {
        (self.left, self.top)
    }

    pub fn bottom_right(&self) -> (i32, i32) {
        (self.right, self.bottom)
    }
}

/// Detections from one classify call, in service order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InferenceResult {
    pub detections: Vec<Detection>,
}

impl InferenceResult {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    /// Highest-confidence detection, see [`select_best`](super::select_best).
    pub fn best(&self) -> Option<&Detection> {
        super::select_best(&self.detections)
    }
}

impl From<Vec<Detection>> for InferenceResult {
    fn from(detections: Vec<Detection>) -> Self {
        Self::new(detections)
    }
}
