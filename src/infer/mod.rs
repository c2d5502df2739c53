//! Inference gateway.
//!
//! The classification service is reached through the [`Classifier`]
//! capability. A call blocks the capture loop; it is the only operation that
//! suspends. [`InFlightGuard`] marks the call as outstanding and clears the
//! mark on every exit path.

mod http;

pub use http::{classify_url, parse_predictions, HttpClassifier};

use crate::detect::InferenceResult;
use crate::error::InferenceError;
use crate::frame::Frame;

/// Classify one frame.
///
/// Implementations may wrap a blocking HTTP client or drive an async
/// transport to completion; the session only sees this call.
pub trait Classifier {
    fn classify(&mut self, frame: &Frame) -> Result<InferenceResult, InferenceError>;
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn classify(&mut self, frame: &Frame) -> Result<InferenceResult, InferenceError> {
        (**self).classify(frame)
    }
}

/// Scoped ownership of the session's in-flight flag.
///
/// Acquisition fails while a call is already outstanding. Dropping the guard
/// resets the flag, whether the call succeeded, failed, or unwound.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    flag: &'a mut bool,
}

impl<'a> InFlightGuard<'a> {
    pub fn try_acquire(flag: &'a mut bool) -> Option<Self> {
        if *flag {
            return None;
        }
        *flag = true;
        Some(Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        *self.flag = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_sets_and_clears_flag() {
        let mut awaiting = false;
        {
            let guard = InFlightGuard::try_acquire(&mut awaiting);
            assert!(guard.is_some());
        }
        assert!(!awaiting);
    }

    #[test]
    fn second_acquire_is_refused_while_outstanding() {
        let mut awaiting = true;
        assert!(InFlightGuard::try_acquire(&mut awaiting).is_none());
        assert!(awaiting, "refused acquire must not clear the flag");
    }

    #[test]
    fn flag_is_cleared_when_call_fails() {
        fn failing_call(flag: &mut bool) -> Result<(), InferenceError> {
            let _guard = InFlightGuard::try_acquire(flag).expect("idle");
            Err(InferenceError::Transport("connection refused".into()))
        }

        let mut awaiting = false;
        assert!(failing_call(&mut awaiting).is_err());
        assert!(!awaiting);
    }

    #[test]
    fn flag_is_cleared_on_unwind() {
        let mut awaiting = false;
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = InFlightGuard::try_acquire(&mut awaiting).expect("idle");
            panic!("transport blew up");
        }));
        assert!(result.is_err());
        assert!(!awaiting);
    }
}
