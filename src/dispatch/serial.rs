//! Serial channel to the embedded controller.
//!
//! Wire protocol: ASCII label text terminated by `\n`. No handshake, no
//! retransmission, no delivery confirmation.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};

use crate::error::SerialError;

pub const DEFAULT_BAUD: u32 = 115_200;
pub const SUPPORTED_BAUD_RATES: &[u32] = &[9_600, 19_200, 38_400, 57_600, 115_200, 230_400];

/// Exclusively owned serial device, open until dropped.
///
/// `stub://<name>` opens an in-process sink that logs each line instead of
/// touching hardware.
pub struct SerialChannel {
    path: String,
    inner: ChannelInner,
}

enum ChannelInner {
    Device(File),
    Stub(StubLine),
}

impl SerialChannel {
    pub fn open(path: &str, baud: u32) -> Result<Self, SerialError> {
        if !SUPPORTED_BAUD_RATES.contains(&baud) {
            return Err(SerialError::UnsupportedBaud(baud));
        }
        if let Some(name) = path.strip_prefix("stub://") {
            log::info!("serial: opened {} (stub, {} baud)", path, baud);
            return Ok(Self {
                path: path.to_string(),
                inner: ChannelInner::Stub(StubLine::new(name)),
            });
        }

        let file = open_device(path).map_err(|source| SerialError::Open {
            path: path.to_string(),
            source,
        })?;

        #[cfg(target_os = "linux")]
        {
            match termios::configure_raw(&file, baud) {
                Ok(()) => {}
                Err(err) if err.raw_os_error() == Some(libc::ENOTTY) => {
                    log::warn!(
                        "serial: {} is not a tty; baud rate {} not applied",
                        path,
                        baud
                    );
                }
                Err(source) => {
                    return Err(SerialError::Configure {
                        path: path.to_string(),
                        source,
                    })
                }
            }
        }
        #[cfg(not(target_os = "linux"))]
        log::warn!(
            "serial: line settings are not applied on this platform; configure {} for {} baud",
            path,
            baud
        );

        log::info!("serial: opened {} at {} baud", path, baud);
        Ok(Self {
            path: path.to_string(),
            inner: ChannelInner::Device(file),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Write for SerialChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            ChannelInner::Device(file) => file.write(buf),
            ChannelInner::Stub(stub) => stub.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            ChannelInner::Device(file) => file.flush(),
            ChannelInner::Stub(stub) => stub.flush(),
        }
    }
}

impl Drop for SerialChannel {
    fn drop(&mut self) {
        log::info!("serial: closed {}", self.path);
    }
}

#[cfg(unix)]
fn open_device(path: &str) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut options = OpenOptions::new();
    options.read(true).write(true);
    #[cfg(target_os = "linux")]
    options.custom_flags(libc::O_NOCTTY);
    options.open(path)
}

#[cfg(not(unix))]
fn open_device(path: &str) -> io::Result<File> {
    OpenOptions::new().read(true).write(true).open(path)
}

/// Logs complete lines written to a stub channel.
struct StubLine {
    name: String,
    pending: Vec<u8>,
}

impl StubLine {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pending: Vec::new(),
        }
    }
}

impl Write for StubLine {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            log::info!(
                "serial stub {}: {}",
                self.name,
                String::from_utf8_lossy(&line[..line.len() - 1])
            );
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(target_os = "linux")]
mod termios {
    use std::fs::File;
    use std::io;
    use std::os::unix::io::AsRawFd;

    fn speed_for(baud: u32) -> Option<libc::speed_t> {
        match baud {
            9_600 => Some(libc::B9600),
            19_200 => Some(libc::B19200),
            38_400 => Some(libc::B38400),
            57_600 => Some(libc::B57600),
            115_200 => Some(libc::B115200),
            230_400 => Some(libc::B230400),
            _ => None,
        }
    }

    /// Raw 8N1 at `baud`, receiver enabled, modem control lines ignored.
    pub(super) fn configure_raw(file: &File, baud: u32) -> io::Result<()> {
        let speed = speed_for(baud).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("baud {}", baud))
        })?;
        let fd = file.as_raw_fd();

        let mut tio: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(fd, &mut tio) } != 0 {
            return Err(io::Error::last_os_error());
        }
        unsafe { libc::cfmakeraw(&mut tio) };
        tio.c_cflag |= libc::CLOCAL | libc::CREAD;
        tio.c_cflag &= !(libc::CSTOPB | libc::PARENB);
        if unsafe { libc::cfsetispeed(&mut tio, speed) } != 0
            || unsafe { libc::cfsetospeed(&mut tio, speed) } != 0
        {
            return Err(io::Error::last_os_error());
        }
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tio) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_baud_is_rejected_before_open() {
        let err = SerialChannel::open("/dev/does-not-exist", 1234).err().unwrap();
        assert!(matches!(err, SerialError::UnsupportedBaud(1234)));
    }

    #[test]
    fn missing_device_is_open_error() {
        let err = SerialChannel::open("/dev/does-not-exist-relay", DEFAULT_BAUD)
            .err()
            .unwrap();
        assert!(matches!(err, SerialError::Open { .. }));
    }

    #[test]
    fn stub_channel_accepts_writes() {
        let mut channel = SerialChannel::open("stub://bench", DEFAULT_BAUD).unwrap();
        channel.write_all(b"plastic\npap").unwrap();
        channel.write_all(b"er\n").unwrap();
        channel.flush().unwrap();
        assert_eq!(channel.path(), "stub://bench");
    }

    #[cfg(unix)]
    #[test]
    fn regular_file_stands_in_for_a_device() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        {
            let mut channel = SerialChannel::open(&path, DEFAULT_BAUD).unwrap();
            channel.write_all(b"metal\n").unwrap();
        }
        assert_eq!(std::fs::read(&path).unwrap(), b"metal\n");
    }
}
