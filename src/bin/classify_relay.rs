//! classify_relay - operator-triggered classification relayed to a serial controller
//!
//! This binary:
//! 1. Opens the serial controller and the camera (fatal if either is missing)
//! 2. Shows the live feed and waits for Enter (capture) or `q` (quit)
//! 3. Sends the captured frame to the classification service
//! 4. Writes the best label to the controller when it changed
//! 5. Releases every device on quit, Ctrl-C or error

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use classify_relay::ui::Ui;
use classify_relay::{
    Console, Controller, HeadlessDisplay, HttpClassifier, PreviewMode, RelayConfig, SerialChannel,
    SerialDispatcher, SnapshotDisplay, TerminalConsole, TerminalKeys, V4l2Config, V4l2Source,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Capture frames on demand, classify them remotely and relay labels over serial"
)]
struct Args {
    /// Path to a JSON or TOML config file.
    #[arg(long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Camera device (e.g. /dev/video0, or stub://bench for a synthetic feed).
    #[arg(long)]
    camera_device: Option<String>,

    /// Serial device of the controller (e.g. /dev/ttyACM0, or stub://bench).
    #[arg(long)]
    serial_device: Option<String>,

    /// Preview mode (headless|snapshot|window).
    #[arg(long, value_name = "MODE")]
    preview: Option<String>,

    /// UI mode for stderr progress (auto|plain|pretty).
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut cfg = RelayConfig::load_from(args.config.as_deref())?;
    if let Some(device) = args.camera_device {
        cfg.camera.device = device;
    }
    if let Some(device) = args.serial_device {
        cfg.serial.device = device;
    }
    if let Some(mode) = args.preview.as_deref() {
        cfg.preview.mode = mode.parse()?;
    }
    cfg.validate()?;

    let keyboard_in_terminal = cfg.preview.mode != PreviewMode::Window;
    init_logging(keyboard_in_terminal);
    log::debug!("config: {:?}", cfg);

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst))
            .context("install interrupt handler")?;
    }

    let channel = SerialChannel::open(&cfg.serial.device, cfg.serial.baud)
        .context("unable to open the serial controller")?;
    log::info!("labels will be relayed to {}", channel.path());

    let mut source = V4l2Source::new(V4l2Config {
        device: cfg.camera.device.clone(),
        target_fps: cfg.camera.target_fps,
        width: cfg.camera.width,
        height: cfg.camera.height,
    })?;
    source
        .connect()
        .context("unable to access the camera")?;

    let classifier = HttpClassifier::new(&cfg.inference)?;
    let ui = Ui::from_flag(Some(&args.ui), std::io::stderr().is_terminal());

    let session = Session {
        source,
        classifier,
        channel,
        ui,
        throttle: cfg.inference.throttle,
    };

    match cfg.preview.mode {
        PreviewMode::Headless => {
            let keys = open_terminal_keys()?;
            session.run(TerminalConsole::new(keys, HeadlessDisplay), &shutdown)
        }
        PreviewMode::Snapshot => {
            let keys = open_terminal_keys()?;
            let preview = SnapshotDisplay::new(cfg.preview.snapshot_path.clone());
            log::info!(
                "annotated results will be written to {}",
                preview.path().display()
            );
            session.run(TerminalConsole::new(keys, preview), &shutdown)
        }
        PreviewMode::Window => run_window(session, &cfg, &shutdown),
    }
}

/// Devices acquired at startup, handed to the controller as one unit.
struct Session {
    source: V4l2Source,
    classifier: HttpClassifier,
    channel: SerialChannel,
    ui: Ui,
    throttle: std::time::Duration,
}

impl Session {
    fn run<K: Console>(self, console: K, shutdown: &AtomicBool) -> Result<()> {
        let mut controller = Controller::new(
            self.source,
            self.classifier,
            console,
            SerialDispatcher::new(self.channel),
            self.throttle,
        )
        .with_ui(self.ui);

        let summary = controller.run(shutdown)?;
        log::info!(
            "session: frames={} missed={} captures={} sent={} duplicates={} empty={} inference_failures={} serial_failures={}",
            summary.frames,
            summary.missed_frames,
            summary.captures,
            summary.labels_sent,
            summary.duplicate_labels,
            summary.empty_results,
            summary.inference_failures,
            summary.serial_failures
        );
        Ok(())
    }
}

#[cfg(feature = "preview-window")]
fn run_window(session: Session, cfg: &RelayConfig, shutdown: &AtomicBool) -> Result<()> {
    let window = classify_relay::WindowDisplay::open(
        "Live Camera Feed",
        cfg.camera.width,
        cfg.camera.height,
    )?;
    session.run(window, shutdown)
}

#[cfg(not(feature = "preview-window"))]
fn run_window(_session: Session, _cfg: &RelayConfig, _shutdown: &AtomicBool) -> Result<()> {
    Err(anyhow!(
        "window preview requires the preview-window feature; use headless or snapshot"
    ))
}

fn open_terminal_keys() -> Result<TerminalKeys> {
    if !std::io::stdin().is_terminal() {
        return Err(anyhow!(
            "keyboard trigger needs an interactive terminal on stdin"
        ));
    }
    TerminalKeys::open()
}

fn init_logging(raw_terminal: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if raw_terminal {
        // Raw mode turns off output post-processing, so return the carriage here.
        builder.format(|buf, record| {
            writeln!(
                buf,
                "[{} {:<5} {}] {}\r",
                buf.timestamp(),
                record.level(),
                record.target(),
                record.args()
            )
        });
    }
    builder.init();
}
