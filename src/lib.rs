//! Classify relay
//!
//! Bridges a live camera feed, an on-demand remote classification service and
//! an embedded controller on a serial line. The operator presses Enter to
//! classify the current frame; the best label is written to the controller
//! only when it differs from the last label written.
//!
//! # Module Structure
//!
//! - `ingest`: frame sources (V4L2, synthetic `stub://`)
//! - `trigger`: key presses to `CaptureRequested` / `Quit`
//! - `infer`: classifier capability, in-flight guard, hosted HTTP client
//! - `detect`: detections and best-result selection
//! - `dispatch`: label debouncing and the serial channel
//! - `overlay`, `display`: operator preview
//! - `session`: the state machine and capture loop
//! - `config`: file + environment configuration

pub mod config;
pub mod detect;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod frame;
pub mod infer;
pub mod ingest;
pub mod overlay;
pub mod session;
pub mod trigger;
pub mod ui;

pub use config::{PreviewMode, RelayConfig};
pub use detect::{select_best, BoundingBox, Detection, InferenceResult};
pub use dispatch::{LabelDebouncer, SerialChannel, SerialDispatcher};
#[cfg(feature = "preview-window")]
pub use display::WindowDisplay;
pub use display::{Console, Display, HeadlessDisplay, SnapshotDisplay, TerminalConsole};
pub use error::{CaptureError, InferenceError, SerialError};
pub use frame::Frame;
pub use infer::{Classifier, HttpClassifier, InFlightGuard};
pub use ingest::{FrameSource, SourceStats, V4l2Config, V4l2Source};
pub use session::{Controller, RunSummary, Session, SessionState};
pub use trigger::{quit_in_backlog, CaptureTrigger, Key, KeySource, TerminalKeys, TriggerEvent};
