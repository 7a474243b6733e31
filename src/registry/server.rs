//! Listening-socket registry for `AT+SERVERSTART`
//!
//! Mirrors `modemsimul.py`'s `self.__servers` dict plus its
//! `select.select(servers, [], [], 0)` readiness poll: listeners are
//! opened non-blocking, so attempting `accept()` on each of them doubles
//! as the zero-timeout readiness check the original performs with `select`.

use crate::constants::SERVER_LISTEN_BACKLOG;
use socket2::{Domain, Socket, Type};
use std::collections::BTreeMap;
use std::net::{SocketAddr, TcpListener, TcpStream};
use tracing::{debug, warn};

/// Mapping from TCP port to a listening socket.
#[derive(Default)]
pub struct ServerRegistry {
    listeners: BTreeMap<u16, TcpListener>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or no-op if already listening) a server on the port parsed
    /// from `port_arg`, which is `<port>,<unused>` as sent by
    /// `AT+SERVERSTART=<port>,<unused>`. Returns the exact AT reply.
    pub fn start(&mut self, port_arg: &str) -> String {
        let port_part = port_arg.split_once(',').map_or(port_arg, |(p, _)| p);
        let port: u16 = match port_part.trim().parse() {
            Ok(p) => p,
            Err(_) => return "\r\nERROR".to_string(),
        };

        if self.listeners.contains_key(&port) {
            debug!("already listening on port {}", port);
            return "\r\nOK".to_string();
        }

        match bind_reusable(port) {
            Ok(listener) => {
                debug!("listening on port {}", port);
                self.listeners.insert(port, listener);
                "\r\nOK".to_string()
            }
            Err(e) => {
                warn!("failed to bind port {}: {}", port, e);
                "\r\nERROR".to_string()
            }
        }
    }

    /// Attempt one non-blocking accept on every listener. Returns every
    /// connection that was pending this round, in port order.
    pub fn poll_accepts(&self) -> Vec<(u16, TcpStream, SocketAddr)> {
        let mut accepted = Vec::new();
        for (&port, listener) in &self.listeners {
            match listener.accept() {
                Ok((stream, addr)) => accepted.push((port, stream, addr)),
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => warn!("accept error on port {}: {}", port, e),
            }
        }
        accepted
    }

    /// Close every listener and empty the registry (`ATZ`).
    pub fn close_all(&mut self) {
        for (port, _) in self.listeners.iter() {
            debug!("closing server at port {}", port);
        }
        self.listeners.clear();
    }

    #[cfg(test)]
    pub fn is_listening(&self, port: u16) -> bool {
        self.listeners.contains_key(&port)
    }
}

fn bind_reusable(port: u16) -> std::io::Result<TcpListener> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let socket = Socket::new(Domain::IPV4, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(SERVER_LISTEN_BACKLOG as i32)?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}
