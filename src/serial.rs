//! Serial transport
//!
//! Opens the serial device with the configured framing and exposes the
//! drain-with-quiescence read contract of spec.md §4.1: the serial line
//! has no reliable end-of-message marker, so a short idle timer approximates
//! one.

use crate::config::SerialConfig;
use crate::constants::SERIAL_DRAIN_POLL_MS;
use crate::error::{ModemError, Result};
use bytes::Bytes;
use std::io::{Read, Write};
use std::time::Duration;
use tracing::warn;

/// Byte-oriented duplex channel to the host.
pub struct SerialPort {
    config: SerialConfig,
    port: Box<dyn serialport::SerialPort>,
}

impl SerialPort {
    /// Open the serial device with the given configuration.
    pub fn open(config: SerialConfig) -> Result<Self> {
        let port = open_inner(&config)?;
        Ok(Self { config, port })
    }

    /// Close and reopen the serial device, used by the `ATZ` reset path.
    pub fn reopen(&mut self) -> Result<()> {
        self.port = open_inner(&self.config)?;
        Ok(())
    }

    /// Write all bytes, unframed.
    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.port
            .write_all(data)
            .map_err(|e| ModemError::SerialIo { source: e })
    }

    /// Drain everything currently buffered and attempt UTF-8 decoding.
    ///
    /// Returns `Ok(None)` if nothing was read, or if the read bytes were
    /// not valid UTF-8 (logged as noise, data dropped, non-fatal per
    /// spec.md §7 `DecodeError`).
    pub fn drain_all_text(&mut self) -> Result<Option<String>> {
        let raw = self.drain_raw()?;
        if raw.is_empty() {
            return Ok(None);
        }
        match String::from_utf8(raw) {
            Ok(s) => Ok(Some(s)),
            Err(e) => {
                warn!("the bus is noisy...dropping data! {:?}", e.as_bytes());
                Ok(None)
            }
        }
    }

    /// Drain everything currently buffered without attempting to decode it.
    pub fn drain_all_bytes(&mut self) -> Result<Option<Bytes>> {
        let raw = self.drain_raw()?;
        if raw.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Bytes::from(raw)))
        }
    }

    fn drain_raw(&mut self) -> Result<Vec<u8>> {
        // Give the host time to finish transmitting before the first read.
        std::thread::sleep(Duration::from_millis(SERIAL_DRAIN_POLL_MS));

        let mut buf = [0u8; 4096];
        let mut out = Vec::new();
        loop {
            match self.port.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    out.extend_from_slice(&buf[..n]);
                    std::thread::sleep(Duration::from_millis(SERIAL_DRAIN_POLL_MS));
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(ModemError::SerialIo { source: e }),
            }
        }
        Ok(out)
    }
}

/// Abstraction over the duplex channel to the host, implemented by
/// `SerialPort` and, in tests, by an in-memory double — there is no
/// portable way to open a real serial device without hardware, so the
/// dispatcher/bridge are written against this trait instead of the
/// concrete type.
pub trait Line {
    fn write_all(&mut self, data: &[u8]) -> Result<()>;
    fn drain_all_text(&mut self) -> Result<Option<String>>;
    fn drain_all_bytes(&mut self) -> Result<Option<Bytes>>;
    fn reopen(&mut self) -> Result<()>;
}

impl Line for SerialPort {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        SerialPort::write_all(self, data)
    }

    fn drain_all_text(&mut self) -> Result<Option<String>> {
        SerialPort::drain_all_text(self)
    }

    fn drain_all_bytes(&mut self) -> Result<Option<Bytes>> {
        SerialPort::drain_all_bytes(self)
    }

    fn reopen(&mut self) -> Result<()> {
        SerialPort::reopen(self)
    }
}

fn open_inner(config: &SerialConfig) -> Result<Box<dyn serialport::SerialPort>> {
    let path = config.port_path.to_string_lossy().to_string();

    serialport::new(&path, config.baud)
        .data_bits(match config.data_bits {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            _ => serialport::DataBits::Eight,
        })
        .parity(config.parity.into())
        .stop_bits(config.stop_bits.into())
        .timeout(Duration::from_millis(50))
        .open()
        .map_err(|e| ModemError::SerialOpen {
            port: config.port_path.clone(),
            source: std::io::Error::other(e.to_string()),
        })
}
