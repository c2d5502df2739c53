//! Stderr progress feedback while the loop is blocked on a remote call.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        Self { mode, is_tty }
    }

    /// `plain` / `pretty` force a mode; anything else picks by TTY.
    pub fn from_flag(ui_flag: Option<&str>, is_tty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty)
    }

    /// Plain output, for tests and piped stderr.
    pub fn plain() -> Self {
        Self::new(UiMode::Plain, false)
    }

    fn use_spinner(&self) -> bool {
        match self.mode {
            UiMode::Pretty => true,
            UiMode::Auto => self.is_tty,
            UiMode::Plain => false,
        }
    }

    /// Report `name` as busy until the returned guard drops.
    pub fn busy(&self, name: &str) -> BusyGuard {
        if self.use_spinner() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg} {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(format!("{name}…"));
            BusyGuard::new(name.to_string(), Some(spinner))
        } else {
            log::debug!("{}…", name);
            BusyGuard::new(name.to_string(), None)
        }
    }
}

pub struct BusyGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl BusyGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let message = format!("{} ({})", self.name, format_duration(self.elapsed()));
        if let Some(spinner) = &self.spinner {
            spinner.finish_and_clear();
        }
        log::debug!("done: {}", message);
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
