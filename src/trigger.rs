//! Keyboard edges to session events.

use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};

/// A single key press as seen by the capture loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Enter,
    Char(char),
    /// Ctrl-C in raw mode, or the preview window being closed.
    Interrupt,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerEvent {
    CaptureRequested,
    Quit,
}

/// Enter captures, `q` quits, everything else is ignored.
pub struct CaptureTrigger;

impl CaptureTrigger {
    pub fn map(key: Key) -> Option<TriggerEvent> {
        match key {
            Key::Enter => Some(TriggerEvent::CaptureRequested),
            Key::Char('q') | Key::Interrupt => Some(TriggerEvent::Quit),
            Key::Char(_) | Key::Other => None,
        }
    }
}

/// Non-blocking key input, read at most once per loop iteration.
pub trait KeySource {
    fn poll_key(&mut self) -> Result<Option<Key>>;

    /// Drop keys that queued up while the loop was blocked. Capture requests
    /// are discarded; a quit among them is returned so it still takes effect.
    fn discard_pending(&mut self) -> Result<Option<TriggerEvent>>;
}

/// The quit, if any, hidden in a backlog of discarded keys.
pub fn quit_in_backlog<I>(keys: I) -> Option<TriggerEvent>
where
    I: IntoIterator<Item = Key>,
{
    keys.into_iter()
        .filter_map(CaptureTrigger::map)
        .find(|event| *event == TriggerEvent::Quit)
}

/// Terminal keyboard in raw mode. Raw mode is restored on drop.
///
/// Raw mode swallows SIGINT, so Ctrl-C arrives as a key and maps to quit.
pub struct TerminalKeys {
    _private: (),
}

impl TerminalKeys {
    pub fn open() -> Result<Self> {
        crossterm::terminal::enable_raw_mode().context("enable terminal raw mode")?;
        Ok(Self { _private: () })
    }
}

impl Drop for TerminalKeys {
    fn drop(&mut self) {
        if let Err(err) = crossterm::terminal::disable_raw_mode() {
            log::warn!("failed to restore terminal mode: {}", err);
        }
    }
}

impl KeySource for TerminalKeys {
    fn poll_key(&mut self) -> Result<Option<Key>> {
        if !event::poll(Duration::ZERO).context("poll terminal input")? {
            return Ok(None);
        }
        match event::read().context("read terminal input")? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                Ok(Some(map_key_code(key.code, key.modifiers)))
            }
            _ => Ok(None),
        }
    }

    fn discard_pending(&mut self) -> Result<Option<TriggerEvent>> {
        let mut backlog = Vec::new();
        while event::poll(Duration::ZERO).context("poll terminal input")? {
            if let Event::Key(key) = event::read().context("read terminal input")? {
                if key.kind == KeyEventKind::Press {
                    backlog.push(map_key_code(key.code, key.modifiers));
                }
            }
        }
        if !backlog.is_empty() {
            log::debug!("discarded {} key(s) pressed during inference", backlog.len());
        }
        Ok(quit_in_backlog(backlog))
    }
}

fn map_key_code(code: KeyCode, modifiers: KeyModifiers) -> Key {
    match code {
        KeyCode::Enter => Key::Enter,
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Key::Interrupt,
        KeyCode::Char(c) => Key::Char(c),
        _ => Key::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_requests_capture() {
        assert_eq!(
            CaptureTrigger::map(Key::Enter),
            Some(TriggerEvent::CaptureRequested)
        );
    }

    #[test]
    fn q_and_interrupt_quit() {
        assert_eq!(CaptureTrigger::map(Key::Char('q')), Some(TriggerEvent::Quit));
        assert_eq!(CaptureTrigger::map(Key::Interrupt), Some(TriggerEvent::Quit));
    }

    #[test]
    fn other_keys_are_ignored() {
        for key in [Key::Char('Q'), Key::Char(' '), Key::Char('x'), Key::Other] {
            assert_eq!(CaptureTrigger::map(key), None, "{:?}", key);
        }
    }

    #[test]
    fn quit_survives_a_discarded_backlog() {
        assert_eq!(
            quit_in_backlog([Key::Enter, Key::Char('q'), Key::Enter]),
            Some(TriggerEvent::Quit)
        );
        assert_eq!(
            quit_in_backlog([Key::Enter, Key::Interrupt]),
            Some(TriggerEvent::Quit)
        );
        assert_eq!(quit_in_backlog([Key::Enter, Key::Enter, Key::Other]), None);
        assert_eq!(quit_in_backlog(Vec::new()), None);
    }

    #[test]
    fn ctrl_c_maps_to_interrupt() {
        assert_eq!(
            map_key_code(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Key::Interrupt
        );
        assert_eq!(map_key_code(KeyCode::Char('c'), KeyModifiers::NONE), Key::Char('c'));
        assert_eq!(map_key_code(KeyCode::Enter, KeyModifiers::NONE), Key::Enter);
        assert_eq!(map_key_code(KeyCode::Esc, KeyModifiers::NONE), Key::Other);
    }
}
