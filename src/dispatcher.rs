//! AT command dispatcher and modem state (spec.md §4.6)
//!
//! Grounded on `modemsimul.py::execute_cmd`. The dispatcher holds the
//! modem's echo/PIN/CFUN state and the two registries, and drives the
//! Bridge/HttpBridge components for the data-plane commands.

use crate::bridge::{self, http, BridgeExit};
use crate::constants::{
    CFUN_1_DELAY_SECS, CFUN_6_DELAY_SECS, MODEM_VERSION, NETOPEN_DELAY_SECS,
};
use crate::error::Result;
use crate::registry::{ClientRegistry, ServerRegistry};
use crate::serial::Line;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, warn};

/// Modem state (spec.md §3 `ModemState`). Boot defaults match
/// `modemsimul.py`'s `Modem.__init__`: echo off, PIN already unlocked,
/// CFUN mode 1.
#[derive(Debug, Clone)]
pub struct ModemState {
    pub echo: bool,
    pub pin_ready: bool,
    pub cfun: u8,
}

impl Default for ModemState {
    fn default() -> Self {
        Self {
            echo: false,
            pin_ready: true,
            cfun: 1,
        }
    }
}

/// The AT-command parser and reply engine.
pub struct CommandDispatcher {
    state: ModemState,
    servers: ServerRegistry,
    clients: ClientRegistry,
    baud: u32,
}

impl CommandDispatcher {
    pub fn new(baud: u32) -> Self {
        Self {
            state: ModemState::default(),
            servers: ServerRegistry::new(),
            clients: ClientRegistry::new(),
            baud,
        }
    }

    pub fn servers_mut(&mut self) -> &mut ServerRegistry {
        &mut self.servers
    }

    /// Register a freshly accepted connection, announce it on serial, and
    /// immediately enter the Bridge for it (spec.md §4.7, Testable
    /// Property 4: the `+CLIENT:` line precedes any bridged byte; resolves
    /// §9 Open Question 3).
    pub fn announce_and_bridge(
        &mut self,
        serial: &mut dyn Line,
        stream: std::net::TcpStream,
        addr: SocketAddr,
    ) -> Result<()> {
        let id = self.clients.register(stream, addr.ip(), addr.port());

        let announce = format!("\r\n+CLIENT: {},0,{}:{}\r\n", id, addr.ip(), addr.port());
        serial.write_all(announce.as_bytes())?;

        let reply = self.run_bridge_session(serial, &id)?;
        serial.write_all(reply.as_bytes())?;
        Ok(())
    }

    /// Normalize one drained serial chunk and dispatch each command in it
    /// (spec.md §4.6 normalization: strip one trailing `\n`, split on
    /// `\n`, strip one trailing `\r` per line).
    pub fn process_chunk(&mut self, serial: &mut dyn Line, chunk: &str) -> Result<()> {
        let body = chunk.strip_suffix('\n').unwrap_or(chunk);
        for raw_cmd in body.split('\n') {
            let cmd = raw_cmd.strip_suffix('\r').unwrap_or(raw_cmd);
            self.process_command(serial, cmd)?;
        }
        Ok(())
    }

    fn process_command(&mut self, serial: &mut dyn Line, cmd: &str) -> Result<()> {
        debug!("CMD({}): {}", cmd.len(), cmd);

        // The echo must be written before `execute` runs: `ATO` and
        // `AT+CHTTPACT=...` write additional frames to serial from
        // inside `execute` itself (the bridge session, the CHTTPACT
        // request prompt), and those must never race ahead of the echo
        // (spec.md Testable Property 1: echo precedes everything else
        // the command produces, not just the final reply).
        if self.state.echo && !cmd.is_empty() {
            serial.write_all(format!("{}\r\n", cmd).as_bytes())?;
        }

        let (reply, delay_secs) = self.execute(serial, cmd)?;

        if let Some(reply) = reply {
            serial.write_all(reply.as_bytes())?;
        }

        if delay_secs > 0 {
            debug!("sleeping {} seconds", delay_secs);
            std::thread::sleep(Duration::from_secs(delay_secs));
        }

        Ok(())
    }

    fn execute(&mut self, serial: &mut dyn Line, cmd: &str) -> Result<(Option<String>, u64)> {
        match cmd {
            "+++" | "" => Ok((None, 0)),
            "AT" => Ok((Some("\r\nOK".to_string()), 0)),
            "ATZ" => {
                self.reset(serial)?;
                Ok((Some("\r\nOK".to_string()), 0))
            }
            "ATI" => Ok((Some(format!("\r\nModem Simul v{}", MODEM_VERSION)), 0)),
            "ATE0" => {
                self.state.echo = false;
                Ok((Some("\r\nOK".to_string()), 0))
            }
            "ATO" => {
                let reply = self.enter_bridge(serial)?;
                Ok((reply, 0))
            }
            "AT+CFUN=1" => {
                let delay = if self.state.cfun != 1 {
                    self.state.cfun = 1;
                    CFUN_1_DELAY_SECS
                } else {
                    0
                };
                Ok((Some("\r\nOK".to_string()), delay))
            }
            "AT+CFUN=6" => {
                let delay = if self.state.cfun != 6 {
                    self.state.cfun = 6;
                    CFUN_6_DELAY_SECS
                } else {
                    0
                };
                Ok((Some("\r\nOK".to_string()), delay))
            }
            "AT+CPIN?" => {
                let reply = if self.state.pin_ready {
                    "\r\n+CPIN: READY"
                } else {
                    "\r\n+CPIN: SIM PIN"
                };
                Ok((Some(reply.to_string()), 0))
            }
            "AT+CIPMODE=1" => Ok((Some("\r\nOK".to_string()), 0)),
            "AT+NETOPEN" => Ok((Some("\r\nOK".to_string()), NETOPEN_DELAY_SECS)),
            "AT+IPADDR" => Ok((Some("\r\n+IPADDR: 127.127.127.127".to_string()), 0)),
            cmd if cmd.starts_with("AT+CPIN=") => {
                debug!("got pin '{}'", &cmd[8..]);
                self.state.pin_ready = true;
                Ok((
                    Some("\r\n+CPIN: READY\r\n\r\nSMS DONE\r\n\r\nPB DONE".to_string()),
                    0,
                ))
            }
            cmd if cmd.starts_with("AT+CHTTPACT=") => {
                let reply = http::run(serial, &cmd[12..])?;
                Ok((Some(reply), 0))
            }
            cmd if cmd.starts_with("AT+SERVERSTART=") => {
                let reply = self.servers.start(&cmd[15..]);
                Ok((Some(reply), 0))
            }
            other => {
                warn!("unknown CMD: {}", other);
                Ok((Some("ERROR".to_string()), 0))
            }
        }
    }

    /// `ATZ`: close all clients, close all listeners, reopen serial,
    /// reset the id counter, clear selection, reset modem state.
    fn reset(&mut self, serial: &mut dyn Line) -> Result<()> {
        self.clients.close_all();
        self.servers.close_all();
        serial.reopen()?;
        self.clients.reset_counter();
        self.state = ModemState::default();
        Ok(())
    }

    /// `ATO`: resume the Bridge on the currently selected client.
    /// Resolves spec.md §9 Open Question 4: the "no client selected"
    /// reply is built and returned exactly once.
    fn enter_bridge(&mut self, serial: &mut dyn Line) -> Result<Option<String>> {
        let id = match self.clients.selected() {
            Some(id) => id.to_string(),
            None => {
                return Ok(Some(
                    "\r\nSERVERSTART ERROR: no clients connected".to_string(),
                ))
            }
        };
        self.run_bridge_session(serial, &id).map(Some)
    }

    fn run_bridge_session(&mut self, serial: &mut dyn Line, id: &str) -> Result<String> {
        let baud = self.baud;
        let exit = {
            let client = self
                .clients
                .get_mut(id)
                .expect("selected/registered client id must exist");
            debug!(
                "client {} - listening to client from {}:{}",
                id, client.peer_addr, client.peer_port
            );
            bridge::run(serial, client, baud)?
        };

        match exit {
            BridgeExit::Standby => {
                debug!("client {} - stand by", id);
                Ok("\r\nOK".to_string())
            }
            BridgeExit::Closed => {
                debug!("client {} - closed connection", id);
                self.clients.remove(id);
                Ok("\r\nCLOSED".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::net::{TcpListener, TcpStream};

    /// In-memory stand-in for `SerialPort`: there is no portable way to
    /// open a real serial device in a test environment, so the
    /// dispatcher is driven against this `Line` double instead.
    struct FakeSerial {
        written: Vec<u8>,
        reopened: bool,
    }

    impl FakeSerial {
        fn new() -> Self {
            Self {
                written: Vec::new(),
                reopened: false,
            }
        }
    }

    impl Line for FakeSerial {
        fn write_all(&mut self, data: &[u8]) -> Result<()> {
            self.written.extend_from_slice(data);
            Ok(())
        }

        fn drain_all_text(&mut self) -> Result<Option<String>> {
            Ok(None)
        }

        fn drain_all_bytes(&mut self) -> Result<Option<Bytes>> {
            Ok(None)
        }

        fn reopen(&mut self) -> Result<()> {
            self.reopened = true;
            Ok(())
        }
    }

    fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server_side, _) = listener.accept().unwrap();
        (server_side, client)
    }

    #[test]
    fn reset_default_matches_boot_defaults() {
        let state = ModemState::default();
        assert!(!state.echo);
        assert!(state.pin_ready);
        assert_eq!(state.cfun, 1);
    }

    /// Testable Property 1, enabled case: the raw command is echoed
    /// before the reply.
    #[test]
    fn echo_law_prefixes_non_empty_commands_before_reply() {
        let mut dispatcher = CommandDispatcher::new(9600);
        dispatcher.state.echo = true;
        let mut serial = FakeSerial::new();

        dispatcher.process_chunk(&mut serial, "AT\r\n").unwrap();

        assert_eq!(serial.written, b"AT\r\n\r\nOK");
    }

    /// Testable Property 1, disabled case: nothing precedes the reply.
    #[test]
    fn echo_law_silent_when_disabled() {
        let mut dispatcher = CommandDispatcher::new(9600);
        let mut serial = FakeSerial::new();

        dispatcher.process_chunk(&mut serial, "AT\r\n").unwrap();

        assert_eq!(serial.written, b"\r\nOK");
    }

    /// Testable Property 7: exactly `ERROR`, no leading CRLF.
    #[test]
    fn unknown_command_yields_bare_error() {
        let mut dispatcher = CommandDispatcher::new(9600);
        let mut serial = FakeSerial::new();

        dispatcher.process_chunk(&mut serial, "AT+FOO\r\n").unwrap();

        assert_eq!(serial.written, b"ERROR");
    }

    /// Reset law (Testable Property 2), end-to-end: registries, counter,
    /// selection, and modem state all return to their start-of-run
    /// defaults after `ATZ`.
    #[test]
    fn atz_resets_registries_counter_selection_and_state() {
        let mut dispatcher = CommandDispatcher::new(9600);

        let (server_side, _client) = tcp_pair();
        dispatcher
            .clients
            .register(server_side, [127, 0, 0, 1].into(), 9999);
        assert_eq!(dispatcher.servers.start("0"), "\r\nOK");
        dispatcher.state.echo = true;
        dispatcher.state.pin_ready = false;
        dispatcher.state.cfun = 6;

        let mut serial = FakeSerial::new();
        dispatcher.process_chunk(&mut serial, "ATZ\r\n").unwrap();

        assert!(serial.reopened);
        assert_eq!(dispatcher.clients.len(), 0);
        assert_eq!(dispatcher.clients.selected(), None);
        assert!(!dispatcher.servers.is_listening(0));
        assert!(!dispatcher.state.echo);
        assert!(dispatcher.state.pin_ready);
        assert_eq!(dispatcher.state.cfun, 1);

        // Counter restarts from 0.
        let (server_side2, _client2) = tcp_pair();
        let id = dispatcher
            .clients
            .register(server_side2, [127, 0, 0, 1].into(), 10000);
        assert_eq!(id, "0");
    }
}
