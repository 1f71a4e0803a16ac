//! Registry of connected sockets.
//!
//! # Responsibilities
//! - Track every connected socket by ID
//! - Deliver frames to one socket or relay to all others
//! - Publish the connection gauge
//!
//! # Design Decisions
//! - Each socket owns an unbounded outbox; the hub never awaits a slow peer
//! - A closed outbox means the socket task is gone; it is dropped on next send

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use axum::extract::ws::Message;

use crate::observability::metrics;

/// Sending half of a socket's outbox.
pub type Outbox = mpsc::UnboundedSender<Message>;

/// Connected sockets, keyed by ID.
#[derive(Debug)]
pub struct Hub {
    sockets: DashMap<Uuid, Outbox>,
    verbosity: u8,
}

impl Hub {
    /// `verbosity` follows the messaging log level (0..=3).
    pub fn new(verbosity: u8) -> Self {
        Self {
            sockets: DashMap::new(),
            verbosity,
        }
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    pub fn join(&self, id: Uuid, outbox: Outbox) {
        self.sockets.insert(id, outbox);
        metrics::record_connections(self.sockets.len());
    }

    pub fn leave(&self, id: Uuid) {
        if self.sockets.remove(&id).is_some() {
            metrics::record_connections(self.sockets.len());
        }
    }

    /// Queue a frame for one socket. Returns false if it is gone.
    pub fn send_to(&self, id: Uuid, message: Message) -> bool {
        let delivered = self
            .sockets
            .get(&id)
            .is_some_and(|outbox| outbox.send(message).is_ok());
        if !delivered {
            self.leave(id);
        }
        delivered
    }

    /// Queue a frame for every socket except `except`. Returns the number reached.
    pub fn broadcast(&self, except: Option<Uuid>, message: &Message) -> usize {
        let mut stale = Vec::new();
        let mut delivered = 0;
        for entry in self.sockets.iter() {
            if Some(*entry.key()) == except {
                continue;
            }
            if entry.value().send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                stale.push(*entry.key());
            }
        }
        for id in stale {
            self.leave(id);
        }
        delivered
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.sockets.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.sockets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }
}
