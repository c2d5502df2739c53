//! Capture session and its controller loop.
//!
//! `Idle` → (`CaptureRequested`, nothing in flight) → `Inferring` → (classify
//! returns or fails, throttle elapses) → `Idle`. `Quit` or an interrupt from
//! any state ends the loop; the controller's owned resources are released
//! when it drops.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::config::MIN_THROTTLE;
use crate::detect::InferenceResult;
use crate::dispatch::{LabelDebouncer, SerialChannel, SerialDispatcher};
use crate::display::Console;
use crate::frame::Frame;
use crate::infer::{Classifier, InFlightGuard};
use crate::ingest::FrameSource;
use crate::overlay;
use crate::trigger::{CaptureTrigger, TriggerEvent};
use crate::ui::Ui;

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);
const CAPTURE_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Inferring,
    Terminated,
}

/// Mutable controller state: the in-flight flag and the last relayed label.
#[derive(Debug, Default)]
pub struct Session {
    awaiting_inference: bool,
    debouncer: LabelDebouncer,
    terminated: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn awaiting_inference(&self) -> bool {
        self.awaiting_inference
    }

    pub fn last_sent_label(&self) -> Option<&str> {
        self.debouncer.last_sent()
    }

    pub fn state(&self) -> SessionState {
        if self.terminated {
            SessionState::Terminated
        } else if self.awaiting_inference {
            SessionState::Inferring
        } else {
            SessionState::Idle
        }
    }
}

/// Counters reported when the loop exits.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub missed_frames: u64,
    pub captures: u64,
    pub dropped_requests: u64,
    pub inference_failures: u64,
    pub empty_results: u64,
    pub labels_sent: u64,
    pub duplicate_labels: u64,
    pub serial_failures: u64,
}

/// Owns every resource the loop touches; dropping it tears them down.
pub struct Controller<S, C, K, W = SerialChannel>
where
    S: FrameSource,
    C: Classifier,
    K: Console,
    W: Write,
{
    source: S,
    classifier: C,
    console: K,
    dispatcher: SerialDispatcher<W>,
    session: Session,
    throttle: Duration,
    ui: Ui,
    summary: RunSummary,
}

impl<S, C, K, W> Controller<S, C, K, W>
where
    S: FrameSource,
    C: Classifier,
    K: Console,
    W: Write,
{
    /// `throttle` is raised to the one-second floor if set lower.
    pub fn new(
        source: S,
        classifier: C,
        console: K,
        dispatcher: SerialDispatcher<W>,
        throttle: Duration,
    ) -> Self {
        Self {
            source,
            classifier,
            console,
            dispatcher,
            session: Session::new(),
            throttle: throttle.max(MIN_THROTTLE),
            ui: Ui::plain(),
            summary: RunSummary::default(),
        }
    }

    pub fn with_ui(mut self, ui: Ui) -> Self {
        self.ui = ui;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn dispatcher(&self) -> &SerialDispatcher<W> {
        &self.dispatcher
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn console(&self) -> &K {
        &self.console
    }

    /// Run until `q`, a closed preview, or `shutdown` is raised.
    ///
    /// Only terminal I/O failures on the console end the loop with an error;
    /// capture, inference and serial failures are logged and survived.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<RunSummary> {
        log::info!("press Enter to capture a frame or 'q' to exit the live camera feed");
        let mut last_health_log = Instant::now();

        loop {
            if shutdown.load(Ordering::SeqCst) {
                log::info!("interrupt received");
                break;
            }

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                self.log_health();
                last_health_log = Instant::now();
            }

            let frame = match self.source.next_frame() {
                Ok(frame) => frame,
                Err(err) => {
                    log::warn!("unable to capture an image from the camera: {}", err);
                    self.summary.missed_frames += 1;
                    // No frame to classify, but the operator can still leave.
                    if let Some(TriggerEvent::Quit) = self.poll_event()? {
                        break;
                    }
                    std::thread::sleep(CAPTURE_RETRY_DELAY);
                    continue;
                }
            };
            self.summary.frames += 1;

            if let Err(err) = self.console.show(&frame) {
                log::warn!("preview update failed: {:#}", err);
            }

            match self.poll_event()? {
                Some(TriggerEvent::Quit) => break,
                Some(TriggerEvent::CaptureRequested) => {
                    if let Some(TriggerEvent::Quit) = self.handle_capture(frame)? {
                        break;
                    }
                }
                None => {}
            }
        }

        self.session.terminated = true;
        log::info!("exiting...");
        Ok(self.summary.clone())
    }

    fn log_health(&self) {
        let source = match self.source.stats() {
            Some(stats) => format!("{} captured={}", stats.device, stats.frames_captured),
            None => "source".to_string(),
        };
        if self.source.is_healthy() {
            log::debug!(
                "health: {} frames={} missed={} captures={} sent={}",
                source,
                self.summary.frames,
                self.summary.missed_frames,
                self.summary.captures,
                self.summary.labels_sent
            );
        } else {
            log::warn!(
                "health: {} unhealthy, missed={} of {} frames",
                source,
                self.summary.missed_frames,
                self.summary.frames + self.summary.missed_frames
            );
        }
    }

    fn poll_event(&mut self) -> Result<Option<TriggerEvent>> {
        Ok(self.console.poll_key()?.and_then(CaptureTrigger::map))
    }

    /// Classify `frame` and relay the result, unless a call is in flight.
    ///
    /// Returns a quit the operator typed while the call was blocking.
    pub fn handle_capture(&mut self, frame: Frame) -> Result<Option<TriggerEvent>> {
        let Self {
            classifier,
            console,
            dispatcher,
            session,
            throttle,
            ui,
            summary,
            ..
        } = self;

        let Some(_in_flight) = InFlightGuard::try_acquire(&mut session.awaiting_inference)
        else {
            log::debug!("capture request dropped: inference already in flight");
            summary.dropped_requests += 1;
            return Ok(None);
        };
        summary.captures += 1;
        log::info!("capturing frame and sending for inference...");

        let outcome = {
            let _busy = ui.busy("classifying frame");
            classifier.classify(&frame)
        };

        match outcome {
            Ok(result) => relay_result(
                &frame,
                &result,
                console,
                dispatcher,
                &mut session.debouncer,
                summary,
            ),
            Err(err) => {
                log::error!("inference failed: {}", err);
                summary.inference_failures += 1;
            }
        }

        // Throttle before the next capture can begin.
        std::thread::sleep(*throttle);
        let pending = console.discard_pending()?;
        if pending.is_some() {
            log::info!("quit requested during inference");
        }
        Ok(pending)
    }
}

fn relay_result<K: Console, W: Write>(
    frame: &Frame,
    result: &InferenceResult,
    console: &mut K,
    dispatcher: &mut SerialDispatcher<W>,
    debouncer: &mut LabelDebouncer,
    summary: &mut RunSummary,
) {
    let Some(best) = result.best() else {
        log::info!("no predictions made");
        summary.empty_results += 1;
        return;
    };

    log::info!(
        "detected: {}, confidence: {:.2}, bounding box: [{}, {}, {}, {}]",
        best.class,
        best.confidence,
        best.x,
        best.y,
        best.width,
        best.height
    );

    let annotated = overlay::annotate(frame, best);
    if let Err(err) = console.show_result(&annotated) {
        log::warn!("preview update failed: {:#}", err);
    }

    if !debouncer.emit(&best.class) {
        log::debug!("label '{}' unchanged; serial write suppressed", best.class);
        summary.duplicate_labels += 1;
        return;
    }
    match dispatcher.send(&best.class) {
        Ok(()) => {
            log::info!("sent '{}' to controller", best.class);
            summary.labels_sent += 1;
        }
        Err(err) => {
            // Best effort: the label stays recorded as sent, no retry.
            log::error!("{}", err);
            summary.serial_failures += 1;
        }
    }
}
