//! Captured frame container.
//!
//! - `Frame`: packed RGB8 pixels plus dimensions. The most recent frame is the
//!   only one the loop cares about; frames carry no identity.
//! - JPEG encoding for the classification request and preview snapshots.

use image::codecs::jpeg::JpegEncoder;
use image::{ImageResult, RgbImage};

use crate::error::CaptureError;

/// Bytes per pixel for packed RGB8.
pub const RGB_CHANNELS: usize = 3;

/// Packed RGB8 frame.
#[derive(Clone)]
pub struct Frame {
    data: Vec<u8>,

    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Wrap a packed RGB8 buffer. Extra trailing bytes (driver padding) are
    /// dropped; a short buffer is rejected.
    pub fn from_rgb(mut data: Vec<u8>, width: u32, height: u32) -> Result<Self, CaptureError> {
        let expected = width as usize * height as usize * RGB_CHANNELS;
        if data.len() < expected {
            return Err(CaptureError::Malformed {
                expected,
                actual: data.len(),
            });
        }
        data.truncate(expected);
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn from_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: image.into_raw(),
            width,
            height,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Copy into an `RgbImage` for drawing.
    pub fn to_image(&self) -> RgbImage {
        // Length was validated at construction.
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    /// Encode as baseline JPEG. `quality` is clamped to 1..=100.
    pub fn encode_jpeg(&self, quality: u8) -> ImageResult<Vec<u8>> {
        let mut buffer = Vec::with_capacity(self.data.len() / 8);
        JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
            .encode_image(&self.to_image())?;
        Ok(buffer)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}
