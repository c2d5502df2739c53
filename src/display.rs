//! Operator-facing preview surfaces.
//!
//! The preview is feedback only: nothing drawn here feeds back into the
//! capture loop. A console pairs a preview with the key source the operator
//! uses, since the window backend owns both.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;

use crate::frame::Frame;
use crate::trigger::{Key, KeySource, TerminalKeys, TriggerEvent};

const SNAPSHOT_JPEG_QUALITY: u8 = 85;

/// Somewhere to put frames for the operator.
pub trait Display {
    /// A live frame, called once per loop iteration.
    fn show(&mut self, frame: &Frame) -> Result<()>;

    /// A frame annotated with a classification result.
    fn show_result(&mut self, frame: &Frame) -> Result<()> {
        self.show(frame)
    }
}

/// Preview plus key input, as driven by the session.
pub trait Console: Display + KeySource {}

impl<T: Display + KeySource> Console for T {}

/// No preview at all.
#[derive(Debug, Default)]
pub struct HeadlessDisplay;

impl Display for HeadlessDisplay {
    fn show(&mut self, _frame: &Frame) -> Result<()> {
        Ok(())
    }

    fn show_result(&mut self, _frame: &Frame) -> Result<()> {
        Ok(())
    }
}

/// Writes the latest annotated frame to a JPEG file.
///
/// Live frames are not written; the file only changes when a result is shown.
/// Writes go to a sibling temp file first so readers never see a torn image.
#[derive(Debug)]
pub struct SnapshotDisplay {
    path: PathBuf,
    written: u64,
}

impl SnapshotDisplay {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl Display for SnapshotDisplay {
    fn show(&mut self, _frame: &Frame) -> Result<()> {
        Ok(())
    }

    fn show_result(&mut self, frame: &Frame) -> Result<()> {
        let tmp = self.path.with_extension("jpg.tmp");
        {
            let file = File::create(&tmp)
                .with_context(|| format!("create snapshot {}", tmp.display()))?;
            let mut writer = BufWriter::new(file);
            JpegEncoder::new_with_quality(&mut writer, SNAPSHOT_JPEG_QUALITY)
                .encode_image(&frame.to_image())
                .context("encode snapshot")?;
        }
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replace snapshot {}", self.path.display()))?;
        self.written += 1;
        log::debug!("snapshot written to {}", self.path.display());
        Ok(())
    }
}

/// Terminal keyboard with a non-window preview.
pub struct TerminalConsole<D: Display> {
    keys: TerminalKeys,
    preview: D,
}

impl<D: Display> TerminalConsole<D> {
    pub fn new(keys: TerminalKeys, preview: D) -> Self {
        Self { keys, preview }
    }
}

impl<D: Display> Display for TerminalConsole<D> {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        self.preview.show(frame)
    }

    fn show_result(&mut self, frame: &Frame) -> Result<()> {
        self.preview.show_result(frame)
    }
}

impl<D: Display> KeySource for TerminalConsole<D> {
    fn poll_key(&mut self) -> Result<Option<Key>> {
        self.keys.poll_key()
    }

    fn discard_pending(&mut self) -> Result<Option<TriggerEvent>> {
        self.keys.discard_pending()
    }
}

#[cfg(feature = "preview-window")]
pub use window::WindowDisplay;

#[cfg(feature = "preview-window")]
mod window {
    use anyhow::{anyhow, Result};
    use minifb::{KeyRepeat, Window, WindowOptions};

    use super::{pick_key, Display};
    use crate::frame::Frame;
    use crate::trigger::{quit_in_backlog, Key, KeySource, TriggerEvent};

    /// Desktop window preview that also supplies key presses.
    pub struct WindowDisplay {
        window: Window,
        buffer: Vec<u32>,
        width: usize,
        height: usize,
    }

    impl WindowDisplay {
        pub fn open(title: &str, width: u32, height: u32) -> Result<Self> {
            let (width, height) = (width as usize, height as usize);
            let window = Window::new(title, width, height, WindowOptions::default())
                .map_err(|err| anyhow!("open preview window: {}", err))?;
            Ok(Self {
                window,
                buffer: vec![0; width * height],
                width,
                height,
            })
        }
    }

    impl Display for WindowDisplay {
        fn show(&mut self, frame: &Frame) -> Result<()> {
            let (width, height) = (frame.width as usize, frame.height as usize);
            if width != self.width || height != self.height {
                self.buffer = vec![0; width * height];
                self.width = width;
                self.height = height;
            }
            for (dst, px) in self.buffer.iter_mut().zip(frame.pixels().chunks_exact(3)) {
                *dst = (u32::from(px[0]) << 16) | (u32::from(px[1]) << 8) | u32::from(px[2]);
            }
            self.window
                .update_with_buffer(&self.buffer, self.width, self.height)
                .map_err(|err| anyhow!("update preview window: {}", err))
        }
    }

    impl KeySource for WindowDisplay {
        fn poll_key(&mut self) -> Result<Option<Key>> {
            if !self.window.is_open() {
                return Ok(Some(Key::Interrupt));
            }
            let keys = self.window.get_keys_pressed(KeyRepeat::No);
            Ok(pick_key(keys.iter().map(map_window_key)))
        }

        fn discard_pending(&mut self) -> Result<Option<TriggerEvent>> {
            self.window.update();
            if !self.window.is_open() {
                return Ok(Some(TriggerEvent::Quit));
            }
            let backlog = self.window.get_keys_pressed(KeyRepeat::No);
            if !backlog.is_empty() {
                log::debug!("discarded {} key(s) pressed during inference", backlog.len());
            }
            Ok(quit_in_backlog(backlog.iter().map(map_window_key)))
        }
    }

    fn map_window_key(key: &minifb::Key) -> Key {
        match key {
            minifb::Key::Enter | minifb::Key::NumPadEnter => Key::Enter,
            minifb::Key::Q => Key::Char('q'),
            _ => Key::Other,
        }
    }
}

/// Collapse the keys of one preview frame into the one the loop acts on.
/// Quit wins over capture; capture wins over other keys.
#[cfg_attr(not(feature = "preview-window"), allow(dead_code))]
fn pick_key<I>(keys: I) -> Option<Key>
where
    I: IntoIterator<Item = Key>,
{
    let mut picked = None;
    for key in keys {
        picked = match (picked, key) {
            (_, Key::Char('q') | Key::Interrupt) => return Some(key),
            (Some(Key::Enter), _) => Some(Key::Enter),
            (_, Key::Enter) => Some(Key::Enter),
            (None, other) => Some(other),
            (current, _) => current,
        };
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_outranks_capture_within_one_frame() {
        assert_eq!(
            pick_key([Key::Enter, Key::Char('q')]),
            Some(Key::Char('q'))
        );
        assert_eq!(pick_key([Key::Other, Key::Enter]), Some(Key::Enter));
        assert_eq!(pick_key([Key::Other]), Some(Key::Other));
        assert_eq!(pick_key(Vec::new()), None);
    }

    #[test]
    fn snapshot_only_written_for_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.jpg");
        let mut display = SnapshotDisplay::new(&path);
        let frame = Frame::from_rgb(vec![40u8; 8 * 8 * 3], 8, 8).unwrap();

        display.show(&frame).unwrap();
        assert!(!path.exists());

        display.show_result(&frame).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(display.written(), 1);
        assert!(!path.with_extension("jpg.tmp").exists());
    }
}
