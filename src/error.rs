//! Centralized error types for the modem simulator
//!
//! All simulator errors are represented by the `ModemError` enum. Use
//! `Result<T>` as shorthand for `std::result::Result<T, ModemError>`.

use std::fmt;
use std::path::PathBuf;

/// All simulator errors, grouped by the kinds named in spec.md §7.
#[derive(Debug)]
pub enum ModemError {
    // === Config ===
    /// Bad serial port path, invalid baud, or invalid framing tuple.
    Config { field: &'static str, reason: String },

    // === I/O ===
    /// Serial open/close/reopen failure.
    SerialOpen {
        port: PathBuf,
        source: std::io::Error,
    },
    /// Serial read/write failure other than a timeout.
    SerialIo { source: std::io::Error },
    /// Failed to bind a TCP listener for `AT+SERVERSTART`.
    ServerBind { port: u16, source: std::io::Error },
    /// Failed to accept or interact with a TCP client, outside of the
    /// would-block/timeout cases the peer-close probe treats as normal.
    ClientIo { source: std::io::Error },
    /// Failed to connect to or exchange data with a `CHTTPACT` remote host.
    HttpIo {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    // === Decode ===
    /// Serial buffer was not valid UTF-8 when a decoded read was requested.
    Decode,

    // === Protocol ===
    /// Unrecognized AT command.
    Protocol { command: String },

    // === Parameter ===
    /// Malformed arguments to `AT+SERVERSTART` or `AT+CHTTPACT`.
    Parameter { command: &'static str, reason: String },
}

impl std::error::Error for ModemError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SerialOpen { source, .. }
            | Self::SerialIo { source }
            | Self::ServerBind { source, .. }
            | Self::ClientIo { source }
            | Self::HttpIo { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for ModemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { field, reason } => write!(f, "invalid {}: {}", field, reason),
            Self::SerialOpen { port, .. } => {
                write!(f, "cannot open serial port: {}", port.display())
            }
            Self::SerialIo { source } => write!(f, "serial I/O error: {}", source),
            Self::ServerBind { port, .. } => write!(f, "cannot bind TCP port {}", port),
            Self::ClientIo { source } => write!(f, "client socket error: {}", source),
            Self::HttpIo { host, port, .. } => {
                write!(f, "cannot reach {}:{}", host, port)
            }
            Self::Decode => write!(f, "the bus is noisy (invalid UTF-8)"),
            Self::Protocol { command } => write!(f, "unknown AT command: {}", command),
            Self::Parameter { command, reason } => {
                write!(f, "{}: {}", command, reason)
            }
        }
    }
}

/// Alias for Result with ModemError
pub type Result<T> = std::result::Result<T, ModemError>;
