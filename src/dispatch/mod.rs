//! Label debouncing and serial dispatch.

mod debounce;
pub mod serial;

pub use debounce::LabelDebouncer;
pub use serial::{SerialChannel, DEFAULT_BAUD, SUPPORTED_BAUD_RATES};

use std::io::Write;

use crate::error::SerialError;

/// Writes admitted labels to the owned channel, fire-and-forget.
pub struct SerialDispatcher<W: Write = SerialChannel> {
    channel: W,
    lines_written: u64,
}

impl<W: Write> SerialDispatcher<W> {
    pub fn new(channel: W) -> Self {
        Self {
            channel,
            lines_written: 0,
        }
    }

    /// Write `label` followed by a single newline.
    pub fn send(&mut self, label: &str) -> Result<(), SerialError> {
        let mut line = Vec::with_capacity(label.len() + 1);
        line.extend_from_slice(label.as_bytes());
        line.push(b'\n');
        self.channel.write_all(&line)?;
        self.channel.flush()?;
        self.lines_written += 1;
        Ok(())
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    pub fn get_ref(&self) -> &W {
        &self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct BrokenLine;

    impl Write for BrokenLine {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn send_writes_label_and_newline() {
        let mut dispatcher = SerialDispatcher::new(Vec::new());
        dispatcher.send("plastic").unwrap();
        dispatcher.send("metal").unwrap();
        assert_eq!(dispatcher.get_ref().as_slice(), b"plastic\nmetal\n");
        assert_eq!(dispatcher.lines_written(), 2);
    }

    #[test]
    fn write_fault_is_serial_error() {
        let mut dispatcher = SerialDispatcher::new(BrokenLine);
        let err = dispatcher.send("glass").unwrap_err();
        assert!(matches!(err, SerialError::Write(_)));
        assert_eq!(dispatcher.lines_written(), 0);
    }
}
