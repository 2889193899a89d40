//! Connection registry for the movement server
//!
//! Tracks every live TCP connection by player id together with the queue its
//! writer task drains. The registry itself does no I/O: broadcasting pushes
//! one line into each queue and reports which queues are already closed so
//! the caller can tear those connections down.

use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Lines a connection may have waiting before new ones are dropped.
pub const OUTBOUND_QUEUE_LINES: usize = 256;

/// A connected client and the outbound line queue feeding its socket
#[derive(Debug)]
pub struct Client {
    /// Player id, also sent to the client in the handshake
    pub id: u32,
    /// Peer address, kept for logging
    pub addr: SocketAddr,
    outbound: mpsc::Sender<String>,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr, outbound: mpsc::Sender<String>) -> Self {
        Self { id, addr, outbound }
    }

    /// Queues one line for the writer task. Returns false once the writer is gone.
    ///
    /// A full queue means the peer stopped reading; the line is dropped and the
    /// connection kept, since every snapshot supersedes the previous one.
    pub fn send_line(&self, line: &str) -> bool {
        match self.outbound.try_send(line.to_string()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("Outbound queue for client {} full, dropping line", self.id);
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Owns the set of connected clients
///
/// Player ids are handed out sequentially from 1 and never reused while the
/// server runs. Ids must stay below `id_ceiling`, which is where NPC ids begin,
/// so a connection is refused both when the registry is full and when the id
/// space is exhausted.
pub struct ClientManager {
    /// Connected clients indexed by their player id
    clients: BTreeMap<u32, Client>,
    /// Next id to hand out
    next_client_id: u32,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
    /// First id that belongs to the NPC range
    id_ceiling: u32,
}

impl ClientManager {
    pub fn new(max_clients: usize, id_ceiling: u32) -> Self {
        Self {
            clients: BTreeMap::new(),
            next_client_id: 1,
            max_clients,
            id_ceiling,
        }
    }

    /// Registers a connection and returns its player id, or None if the
    /// server is at capacity.
    pub fn add_client(
        &mut self,
        addr: SocketAddr,
        outbound: mpsc::Sender<String>,
    ) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            warn!("Rejecting {}: server full ({} clients)", addr, self.clients.len());
            return None;
        }
        if self.next_client_id >= self.id_ceiling {
            warn!("Rejecting {}: player id space exhausted", addr);
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients
            .insert(client_id, Client::new(client_id, addr, outbound));
        Some(client_id)
    }

    /// Drops a connection. Returns false if it was already gone.
    pub fn remove_client(&mut self, client_id: u32) -> bool {
        if let Some(client) = self.clients.remove(&client_id) {
            info!("Client {} ({}) disconnected", client.id, client.addr);
            true
        } else {
            false
        }
    }

    /// Queues `line` for every client and returns the ids whose queue is closed.
    pub fn broadcast(&self, line: &str) -> Vec<u32> {
        let failed: Vec<u32> = self
            .clients
            .values()
            .filter(|client| !client.send_line(line))
            .map(|client| client.id)
            .collect();

        if !failed.is_empty() {
            debug!("Broadcast failed for clients {:?}", failed);
        }
        failed
    }

    pub fn send_to(&self, client_id: u32, line: &str) -> bool {
        self.clients
            .get(&client_id)
            .map(|client| client.send_line(line))
            .unwrap_or(false)
    }

    pub fn client_ids(&self) -> Vec<u32> {
        self.clients.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
