//! Accepted-client registry
//!
//! Mirrors `modemsimul.py`'s `self.__clients` dict, `self.__client_selected`,
//! and `self.__clients_id` counter. Resolves spec.md §9 Open Question 2 by
//! tracking insertion order explicitly and falling back to the
//! most-recently-inserted remaining client after a removal.

use crate::constants::CLIENT_READ_TIMEOUT_MS;
use socket2::Socket;
use std::collections::HashMap;
use std::net::{IpAddr, TcpStream};
use std::time::Duration;
use tracing::debug;

/// One accepted TCP connection. The socket is kept as a `socket2::Socket`
/// (rather than `std::net::TcpStream`) so the Bridge can issue the
/// `MSG_PEEK` peer-close probe of spec.md §4.4.1 directly.
pub struct ClientEntry {
    pub peer_addr: IpAddr,
    pub peer_port: u16,
    pub socket: Socket,
}

/// Mapping from client id (decimal string) to `ClientEntry`, plus the
/// currently selected client.
#[derive(Default)]
pub struct ClientRegistry {
    clients: HashMap<String, ClientEntry>,
    /// Insertion order of currently-live ids, oldest first.
    order: Vec<String>,
    selected: Option<String>,
    next_id: u64,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly accepted connection. Sets a 1s read timeout and
    /// selects the new client (spec.md §3 `SelectedClient`: "set on
    /// accept").
    pub fn register(&mut self, socket: TcpStream, peer_addr: IpAddr, peer_port: u16) -> String {
        let socket = Socket::from(socket);
        let _ = socket.set_read_timeout(Some(Duration::from_millis(CLIENT_READ_TIMEOUT_MS)));
        let id = self.next_id.to_string();
        self.next_id += 1;

        self.clients.insert(
            id.clone(),
            ClientEntry {
                peer_addr,
                peer_port,
                socket,
            },
        );
        self.order.push(id.clone());
        self.selected = Some(id.clone());
        id
    }

    /// Explicitly select a client by id. Returns false if it doesn't exist.
    pub fn select(&mut self, id: &str) -> bool {
        if self.clients.contains_key(id) {
            self.selected = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ClientEntry> {
        self.clients.get_mut(id)
    }

    pub fn get(&self, id: &str) -> Option<&ClientEntry> {
        self.clients.get(id)
    }

    /// Remove a client, closing its socket (drop) and falling back the
    /// selection to the most-recently-inserted remaining client.
    pub fn remove(&mut self, id: &str) {
        if self.clients.remove(id).is_none() {
            return;
        }
        self.order.retain(|existing| existing != id);

        if self.selected.as_deref() == Some(id) {
            self.selected = self.order.last().cloned();
        }
        debug!("removed client {}", id);
    }

    /// Close every client and empty the registry (`ATZ`).
    pub fn close_all(&mut self) {
        self.clients.clear();
        self.order.clear();
        self.selected = None;
    }

    /// Reset the id counter to 0 (`ATZ`).
    pub fn reset_counter(&mut self) {
        self.next_id = 0;
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{TcpListener, TcpStream};

    fn pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server_side, _) = listener.accept().unwrap();
        (server_side, client)
    }

    #[test]
    fn register_assigns_monotonic_ids_and_selects_newest() {
        let mut reg = ClientRegistry::new();
        let (s1, _c1) = pair();
        let (s2, _c2) = pair();

        let id1 = reg.register(s1, [127, 0, 0, 1].into(), 1000);
        assert_eq!(id1, "0");
        assert_eq!(reg.selected(), Some("0"));

        let id2 = reg.register(s2, [127, 0, 0, 1].into(), 1001);
        assert_eq!(id2, "1");
        assert_eq!(reg.selected(), Some("1"));
    }

    #[test]
    fn remove_falls_back_to_most_recently_inserted_remaining() {
        let mut reg = ClientRegistry::new();
        let (s0, _c0) = pair();
        let (s1, _c1) = pair();
        let (s2, _c2) = pair();

        let id0 = reg.register(s0, [127, 0, 0, 1].into(), 1000);
        let id1 = reg.register(s1, [127, 0, 0, 1].into(), 1001);
        let id2 = reg.register(s2, [127, 0, 0, 1].into(), 1002);

        reg.select(&id0);
        assert_eq!(reg.selected(), Some(id0.as_str()));

        // Removing the selected client falls back to the last-inserted
        // remaining one (id2), not insertion order id1.
        reg.remove(&id0);
        assert_eq!(reg.selected(), Some(id2.as_str()));

        reg.remove(&id2);
        assert_eq!(reg.selected(), Some(id1.as_str()));

        reg.remove(&id1);
        assert_eq!(reg.selected(), None);
    }

    #[test]
    fn reset_counter_restarts_from_zero() {
        let mut reg = ClientRegistry::new();
        let (s0, _c0) = pair();
        reg.register(s0, [127, 0, 0, 1].into(), 1000);
        reg.close_all();
        reg.reset_counter();

        let (s1, _c1) = pair();
        let id = reg.register(s1, [127, 0, 0, 1].into(), 1001);
        assert_eq!(id, "0");
    }
}
