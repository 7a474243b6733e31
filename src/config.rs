//! Serial configuration types
//!
//! `SerialConfig` is validated once at construction (teacher posture: typed
//! fields, built once, immutable thereafter) and then handed to the core.
//! There is no persisted config file — spec.md §6 states "Persisted state:
//! none".

use crate::constants::{DEFAULT_BAUD_RATE, DEFAULT_FRAMING, SUPPORTED_BAUD_RATES};
use crate::error::{ModemError, Result};
use std::path::PathBuf;

/// Parity setting, one of the five the original checks against
/// `serial.Serial.PARITIES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
    Odd,
    Mark,
    Space,
}

impl Parity {
    fn from_char(c: char) -> Option<Self> {
        match c {
            'N' => Some(Self::None),
            'E' => Some(Self::Even),
            'O' => Some(Self::Odd),
            'M' => Some(Self::Mark),
            'S' => Some(Self::Space),
            _ => None,
        }
    }
}

impl From<Parity> for serialport::Parity {
    fn from(p: Parity) -> Self {
        match p {
            Parity::None => serialport::Parity::None,
            Parity::Even => serialport::Parity::Even,
            Parity::Odd => serialport::Parity::Odd,
            // serialport has no Mark/Space parity; the simulator only
            // needs to echo these back in `ATI`-adjacent diagnostics, so
            // fall back to None on the wire.
            Parity::Mark | Parity::Space => serialport::Parity::None,
        }
    }
}

/// Stop bits, one of the values the original checks against
/// `serial.Serial.STOPBITS` (1, 1.5, 2). `serialport` only models whole
/// stop bits, so 1.5 rounds to `One` (matching the crate's own limitation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for serialport::StopBits {
    fn from(s: StopBits) -> Self {
        match s {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// Validated serial port configuration (spec.md §3 `SerialConfig`).
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub port_path: PathBuf,
    pub baud: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl SerialConfig {
    /// Build and validate a `SerialConfig` from CLI-supplied strings.
    ///
    /// `framing` must be exactly three characters: a data-bits digit
    /// (5-8), a parity letter (N/E/O/M/S), and a stop-bits digit (1/2),
    /// e.g. `"8N1"`.
    pub fn new(port_path: impl Into<PathBuf>, baud: u32, framing: &str) -> Result<Self> {
        let port_path = port_path.into();
        if !port_path.exists() {
            return Err(ModemError::Config {
                field: "serial_port",
                reason: format!("no such file or device: {}", port_path.display()),
            });
        }

        if !SUPPORTED_BAUD_RATES.contains(&baud) {
            return Err(ModemError::Config {
                field: "baud",
                reason: format!(
                    "{} is not one of the supported rates {:?}",
                    baud, SUPPORTED_BAUD_RATES
                ),
            });
        }

        let chars: Vec<char> = framing.chars().collect();
        if chars.len() != 3 {
            return Err(ModemError::Config {
                field: "framing",
                reason: format!(
                    "expected <digit><letter><digit> (e.g. 8N1), got '{}'",
                    framing
                ),
            });
        }

        let data_bits = chars[0].to_digit(10).filter(|d| (5..=8).contains(d)).ok_or_else(|| {
            ModemError::Config {
                field: "framing.data_bits",
                reason: format!("'{}' is not a digit in 5..=8", chars[0]),
            }
        })? as u8;

        let parity = Parity::from_char(chars[1]).ok_or_else(|| ModemError::Config {
            field: "framing.parity",
            reason: format!("'{}' is not one of N/E/O/M/S", chars[1]),
        })?;

        let stop_bits = match chars[2] {
            '1' => StopBits::One,
            '2' => StopBits::Two,
            other => {
                return Err(ModemError::Config {
                    field: "framing.stop_bits",
                    reason: format!("'{}' is not one of 1/2", other),
                })
            }
        };

        Ok(Self {
            port_path,
            baud,
            data_bits,
            parity,
            stop_bits,
        })
    }

    /// Build a `SerialConfig` with the default baud (9600) and framing (8N1).
    pub fn with_defaults(port_path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(port_path, DEFAULT_BAUD_RATE, DEFAULT_FRAMING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_default_framing() {
        let cfg = SerialConfig::new("/dev/null", 9600, "8N1").unwrap();
        assert_eq!(cfg.baud, 9600);
        assert_eq!(cfg.data_bits, 8);
        assert_eq!(cfg.parity, Parity::None);
        assert_eq!(cfg.stop_bits, StopBits::One);
    }

    #[test]
    fn rejects_missing_port_path() {
        let err = SerialConfig::new("/nonexistent/modemsim-test-device", 9600, "8N1").unwrap_err();
        assert!(matches!(
            err,
            ModemError::Config {
                field: "serial_port",
                ..
            }
        ));
    }

    #[test]
    fn rejects_unsupported_baud() {
        let err = SerialConfig::new("/dev/null", 12345, "8N1").unwrap_err();
        assert!(matches!(err, ModemError::Config { field: "baud", .. }));
    }

    #[test]
    fn rejects_short_framing() {
        let err = SerialConfig::new("/dev/null", 9600, "81").unwrap_err();
        assert!(matches!(err, ModemError::Config { field: "framing", .. }));
    }

    #[test]
    fn rejects_bad_parity_letter() {
        let err = SerialConfig::new("/dev/null", 9600, "8X1").unwrap_err();
        assert!(matches!(
            err,
            ModemError::Config {
                field: "framing.parity",
                ..
            }
        ));
    }

    #[test]
    fn rejects_bad_stop_bits() {
        let err = SerialConfig::new("/dev/null", 9600, "8N3").unwrap_err();
        assert!(matches!(
            err,
            ModemError::Config {
                field: "framing.stop_bits",
                ..
            }
        ));
    }
}
