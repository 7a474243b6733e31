//! Command-line interface definition using clap
//!
//! Provides structured argument parsing with automatic help generation.
//! Argument parsing and serial-parameter validation are external
//! collaborators per spec.md §1 — this module is the only place that
//! reads `std::env::args` or validates a baud/framing string.

use clap::Parser;
use std::path::PathBuf;

/// AT-command cellular modem simulator bridging a serial line to TCP
#[derive(Parser, Debug)]
#[command(name = "modemsim")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TCP port (unused by the core, validated as an integer for
    /// compatibility with the original modem simulator's invocation)
    pub tcp_port: u16,

    /// Path to the serial device (e.g. /dev/ttyUSB0 or COM3)
    pub serial_port: PathBuf,

    /// Baud rate (must be one of the driver-supported rates)
    #[arg(long, default_value_t = 9600)]
    pub baud: u32,

    /// Serial framing as <data-bits><parity><stop-bits>, e.g. 8N1
    #[arg(long, default_value = "8N1")]
    pub framing: String,

    /// Enable verbose debug output
    #[arg(short, long)]
    pub verbose: bool,
}
