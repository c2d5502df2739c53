//! Failure kinds surfaced by the capture loop.
//!
//! Each component reports its own error type so the controller can apply a
//! per-kind policy (skip, log and resume, log and continue). Startup code
//! wraps these in `anyhow` with context.

use std::io;

use thiserror::Error;

/// The capture device could not produce a frame.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture device not connected; call connect() first")]
    NotConnected,

    #[error("capture device error: {0}")]
    Device(String),

    #[error("frame buffer holds {actual} bytes, expected {expected}")]
    Malformed { expected: usize, actual: usize },
}

/// The remote classification call failed.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("failed to encode frame: {0}")]
    Encode(String),

    #[error("classification request failed: {0}")]
    Transport(String),

    #[error("classification service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid classification response: {0}")]
    Response(String),
}

/// The serial channel could not be opened or written.
#[derive(Debug, Error)]
pub enum SerialError {
    #[error("failed to open serial device {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to configure serial device {path}: {source}")]
    Configure {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("unsupported baud rate {0}")]
    UnsupportedBaud(u32),

    #[error("serial write failed: {0}")]
    Write(#[from] io::Error),
}
