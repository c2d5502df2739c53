//! Frame ingestion sources.
//!
//! - V4L2 devices (feature: ingest-v4l2)
//! - Synthetic `stub://` source for tests and bench runs
//!
//! Sources are pull-based: the capture loop asks for the next frame once per
//! iteration and treats a failure as transient.

pub mod v4l2;

pub use v4l2::{V4l2Config, V4l2Source};

use crate::error::CaptureError;
use crate::frame::Frame;

/// Frame counters reported in the periodic health log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub device: String,
}

/// Anything that can hand the capture loop its next frame.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Frame, CaptureError>;

    fn stats(&self) -> Option<SourceStats> {
        None
    }

    fn is_healthy(&self) -> bool {
        true
    }
}

impl FrameSource for V4l2Source {
    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        V4l2Source::next_frame(self)
    }

    fn stats(&self) -> Option<SourceStats> {
        Some(V4l2Source::stats(self))
    }

    fn is_healthy(&self) -> bool {
        V4l2Source::is_healthy(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v4l2_source_reports_health_through_the_trait() -> anyhow::Result<()> {
        let mut source = V4l2Source::new(V4l2Config {
            device: "stub://health".to_string(),
            target_fps: 0,
            width: 8,
            height: 8,
        })?;
        source.connect()?;
        source.next_frame()?;

        let source: &dyn FrameSource = &source;
        assert!(source.is_healthy());
        assert_eq!(
            source.stats(),
            Some(SourceStats {
                frames_captured: 1,
                device: "stub://health".to_string(),
            })
        );
        Ok(())
    }
}
