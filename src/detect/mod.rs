mod result;

pub use result::{BoundingBox, Detection, InferenceResult};

/// Pick the detection with the highest confidence.
///
/// Ties go to the first detection encountered. An empty slice yields `None`,
/// which callers report as "no predictions" rather than an error.
pub fn select_best(detections: &[Detection]) -> Option<&Detection> {
    let mut best: Option<&Detection> = None;
    for candidate in detections {
        match best {
            Some(current) if current.confidence >= candidate.confidence => {}
            _ => best = Some(candidate),
        }
    }
    best
}
