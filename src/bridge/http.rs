//! One-shot HTTP bridge for `AT+CHTTPACT` (spec.md §4.5)
//!
//! Grounded on `modemsimul.py::listen_chttpact`. Resolves spec.md §9 Open
//! Question 1: the original's request terminator (`buf.find("")`, which
//! always matches at index 0) is almost certainly a bug. The terminator
//! used here is the HTTP blank line `"\r\n\r\n"` that ends a request's
//! header block.

use crate::constants::{HTTP_RECV_BUFFER_SIZE, HTTP_REQUEST_TIMEOUT_SECS};
use crate::error::{ModemError, Result};
use crate::serial::Line;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

const TERMINATOR: &[u8] = b"\r\n\r\n";

/// Parsed `host,port` arguments, e.g. `"example.com",80`.
struct Args {
    host: String,
    port: u16,
}

fn parse_args(raw: &str) -> std::result::Result<Args, String> {
    let (host_part, port_part) = match raw.split_once(',') {
        Some(parts) => parts,
        None => return Err(format!("incorrect host({}) and port()", raw)),
    };

    let host = host_part.trim().trim_matches('"').to_string();
    let port: std::result::Result<u16, _> = port_part.trim().parse();

    match (host.is_empty(), &port) {
        (true, Err(_)) => Err(format!("incorrect host({}) and port({})", host, port_part)),
        (true, Ok(_)) => Err(format!("incorrect host({})", host)),
        (false, Err(_)) => Err(format!("incorrect port({})", port_part)),
        (false, Ok(p)) => Ok(Args { host, port: *p }),
    }
}

/// Run the `CHTTPACT` request/response cycle. Writes the
/// `+CHTTPACT: REQUEST` prompt itself, then the final reply text; returns
/// the final reply so the dispatcher can log/account for it uniformly.
pub fn run(serial: &mut dyn Line, raw_args: &str) -> Result<String> {
    let args = match parse_args(raw_args) {
        Ok(a) => a,
        Err(reason) => return Ok(format!("\r\n+CHTTPACT ERROR: {}", reason)),
    };

    serial.write_all(b"\r\n+CHTTPACT: REQUEST")?;

    let request = match read_request_until_terminator(serial)? {
        Some(bytes) => bytes,
        None => return Ok("\r\n+CHTTPACT ERROR: request timeout".to_string()),
    };

    let reply = send_request(&args.host, args.port, &request)?;
    Ok(format!("\r\nOK{}", reply))
}

/// Accumulate serial chunks until the buffer contains the blank-line
/// terminator, or until `HTTP_REQUEST_TIMEOUT_SECS` elapses.
fn read_request_until_terminator(serial: &mut dyn Line) -> Result<Option<Vec<u8>>> {
    let deadline = Instant::now() + Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS);
    let mut buf: Vec<u8> = Vec::new();

    loop {
        if let Some(chunk) = serial.drain_all_bytes()? {
            buf.extend_from_slice(&chunk);
            if let Some(pos) = find_subsequence(&buf, TERMINATOR) {
                buf.truncate(pos + TERMINATOR.len());
                return Ok(Some(buf));
            }
        }

        if Instant::now() >= deadline {
            return Ok(None);
        }
    }
}

fn send_request(host: &str, port: u16, request: &[u8]) -> Result<String> {
    let mut stream = TcpStream::connect((host, port)).map_err(|e| ModemError::HttpIo {
        host: host.to_string(),
        port,
        source: e,
    })?;

    stream
        .write_all(request)
        .map_err(|e| ModemError::HttpIo {
            host: host.to_string(),
            port,
            source: e,
        })?;

    let mut buf = vec![0u8; HTTP_RECV_BUFFER_SIZE];
    let n = stream.read(&mut buf).map_err(|e| ModemError::HttpIo {
        host: host.to_string(),
        port,
        source: e,
    })?;

    Ok(String::from_utf8_lossy(&buf[..n]).into_owned())
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_host_and_port() {
        let args = parse_args("\"example.com\",80").unwrap();
        assert_eq!(args.host, "example.com");
        assert_eq!(args.port, 80);
    }

    #[test]
    fn rejects_missing_comma() {
        assert!(parse_args("\"example.com\"").is_err());
    }

    #[test]
    fn rejects_bad_port() {
        let err = parse_args("\"example.com\",notaport").unwrap_err();
        assert!(err.contains("incorrect port"));
    }

    #[test]
    fn rejects_empty_host() {
        let err = parse_args("\"\",80").unwrap_err();
        assert!(err.contains("incorrect host"));
    }

    #[test]
    fn finds_blank_line_terminator() {
        let buf = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n".to_vec();
        assert_eq!(find_subsequence(&buf, TERMINATOR), Some(buf.len() - 4));
    }
}
