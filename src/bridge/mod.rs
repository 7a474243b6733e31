//! Serial ↔ TCP bridge (spec.md §4.4)
//!
//! Grounded on `modemsimul.py::listen_client`'s 7-step loop and the
//! teacher's direction-labeled tracing in `bridge/udp.rs`. Entered via
//! `ATO` or immediately after a new-client accept.

pub mod http;

use crate::error::{ModemError, Result};
use crate::registry::client::ClientEntry;
use crate::serial::Line;
use socket2::Socket;
use std::io::{Read, Write};
use std::mem::MaybeUninit;
use tracing::debug;

/// MSG_PEEK, identical value on the platforms this crate targets.
const MSG_PEEK: i32 = 0x02;

/// How the bridge loop ended.
#[derive(Debug, PartialEq, Eq)]
pub enum BridgeExit {
    /// Host sent `+++`; client stays registered, command mode resumes.
    Standby,
    /// Peer closed the TCP side; caller must remove the client.
    Closed,
}

/// Run the serial↔TCP shuttle for one client until it escapes to command
/// mode or the peer closes the connection.
pub fn run(serial: &mut dyn Line, client: &mut ClientEntry, baud: u32) -> Result<BridgeExit> {
    let banner = format!("\r\nCONNECT {}\r\n", baud);
    serial.write_all(banner.as_bytes())?;

    loop {
        let mut request_standby = false;

        let mut serial_buf = serial.drain_all_bytes()?.map(|b| b.to_vec()).unwrap_or_default();

        if let Some(pos) = find_subsequence(&serial_buf, b"+++") {
            request_standby = true;
            serial_buf.truncate(pos);
        }

        let tcp_buf = recv_tcp(&mut client.socket)?;

        if let Some(ref data) = tcp_buf {
            debug!("GPRS->SERIAL: {} bytes", data.len());
            serial.write_all(data)?;
        }

        if !serial_buf.is_empty() {
            debug!("SERIAL->GPRS: {} bytes", serial_buf.len());
            client
                .socket
                .write_all(&serial_buf)
                .map_err(|e| ModemError::ClientIo { source: e })?;
        }

        if request_standby {
            return Ok(BridgeExit::Standby);
        }

        if peer_closed(&client.socket)? {
            return Ok(BridgeExit::Closed);
        }
    }
}

/// Read up to 65535 bytes from the TCP client. A read timeout/would-block
/// yields `None` without being an error (spec.md §4.4 step 3).
fn recv_tcp(socket: &mut Socket) -> Result<Option<Vec<u8>>> {
    let mut buf = vec![0u8; crate::constants::BRIDGE_RECV_BUFFER_SIZE];
    match socket.read(&mut buf) {
        Ok(0) => Ok(None),
        Ok(n) => {
            buf.truncate(n);
            Ok(Some(buf))
        }
        Err(ref e)
            if e.kind() == std::io::ErrorKind::WouldBlock
                || e.kind() == std::io::ErrorKind::TimedOut =>
        {
            Ok(None)
        }
        Err(e) => Err(ModemError::ClientIo { source: e }),
    }
}

/// Peer-close detection without consuming payload bytes (spec.md §4.4.1).
///
/// Peeks one byte with `MSG_PEEK`: zero bytes returned means the peer
/// closed its side; would-block or read-timeout means it did not.
fn peer_closed(socket: &Socket) -> Result<bool> {
    let mut buf = [MaybeUninit::<u8>::uninit(); 1];
    match socket.recv_with_flags(&mut buf, MSG_PEEK) {
        Ok(0) => Ok(true),
        Ok(_) => Ok(false),
        Err(ref e)
            if e.kind() == std::io::ErrorKind::WouldBlock
                || e.kind() == std::io::ErrorKind::TimedOut =>
        {
            Ok(false)
        }
        Err(e) => Err(ModemError::ClientIo { source: e }),
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
