//! Application-wide constants
//!
//! Centralized constants to avoid duplication and ensure consistency.

// =============================================================================
// Modem identity
// =============================================================================

/// Version string reported by `ATI`.
pub const MODEM_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Timing - Serial drain
// =============================================================================

/// Quiescence delay before and between serial drain reads (spec.md §4.1).
pub const SERIAL_DRAIN_POLL_MS: u64 = 100;

// =============================================================================
// Timing - Event loop
// =============================================================================

/// Idle sleep when neither a serial command nor a pending accept was found.
pub const EVENT_LOOP_IDLE_MS: u64 = 100;

// =============================================================================
// Timing - CFUN / NETOPEN delays
// =============================================================================

/// Delay after a CFUN transition into mode 1.
pub const CFUN_1_DELAY_SECS: u64 = 10;

/// Delay after a CFUN transition into mode 6.
pub const CFUN_6_DELAY_SECS: u64 = 8;

/// Delay after `AT+NETOPEN`.
pub const NETOPEN_DELAY_SECS: u64 = 6;

// =============================================================================
// Networking
// =============================================================================

/// Listen backlog for `AT+SERVERSTART` listeners.
pub const SERVER_LISTEN_BACKLOG: u32 = 5;

/// Read timeout applied to each accepted TCP client.
pub const CLIENT_READ_TIMEOUT_MS: u64 = 1_000;

/// Maximum bytes read per bridge iteration from a TCP client.
pub const BRIDGE_RECV_BUFFER_SIZE: usize = 65_535;

/// Maximum bytes read from the `CHTTPACT` remote reply.
pub const HTTP_RECV_BUFFER_SIZE: usize = 65_535;

/// Maximum time to wait for the host to finish sending a `CHTTPACT` request
/// before giving up and replying with a timeout error. Not present in the
/// original source (whose terminator search never actually matched); added
/// so a host that never sends the blank-line terminator cannot hang the
/// simulator forever.
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Serial framing
// =============================================================================

/// Baud rates accepted by `--baud`, mirroring the original's check against
/// `serial.Serial.BAUDRATES`.
pub const SUPPORTED_BAUD_RATES: &[u32] = &[
    1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200,
];

/// Default baud rate when `--baud` is not given.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default framing string when `--framing` is not given.
pub const DEFAULT_FRAMING: &str = "8N1";
