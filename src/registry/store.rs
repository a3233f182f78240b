//! Client registry implementation
//!
//! Tracks up to `max_clients` subscriber addresses and fans each frame out to
//! them as one datagram. A client stays registered until a send to it fails;
//! there is no timeout-based expiry.

use std::fmt::Debug;
use std::io;
use std::os::unix::net::UnixDatagram;
use std::path::PathBuf;
use std::time::Instant;

use super::entry::{ClientEntry, Registration};

/// Default maximum number of subscribers
pub const MAX_CLIENTS: usize = 8;

/// Something frames can be sent through without waiting
pub trait DatagramSink<A> {
    /// Send one datagram, failing with `WouldBlock` instead of waiting
    fn try_send_to(&self, buf: &[u8], addr: &A) -> io::Result<usize>;
}

/// Non-blocking Unix datagram socket
///
/// Every call is a real `sendto`, so a full receive queue on one client is
/// reported as `WouldBlock` for that client only.
impl DatagramSink<PathBuf> for UnixDatagram {
    fn try_send_to(&self, buf: &[u8], addr: &PathBuf) -> io::Result<usize> {
        self.send_to(buf, addr)
    }
}

/// Bounded set of subscriber addresses
#[derive(Debug)]
pub struct ClientRegistry<A> {
    /// Registered clients, in registration order
    clients: Vec<ClientEntry<A>>,

    /// Capacity
    max_clients: usize,

    /// Clients removed after a failed send
    evictions: u64,
}

impl<A: PartialEq + Debug> ClientRegistry<A> {
    /// Create a registry with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(MAX_CLIENTS)
    }

    /// Create a registry with a custom capacity
    pub fn with_capacity(max_clients: usize) -> Self {
        Self {
            clients: Vec::with_capacity(max_clients),
            max_clients,
            evictions: 0,
        }
    }

    /// Register a client or refresh its contact time
    pub fn register(&mut self, addr: A) -> Registration {
        if let Some(entry) = self.clients.iter_mut().find(|c| c.addr == addr) {
            entry.last_contact = Instant::now();
            return Registration::Refreshed;
        }

        if self.clients.len() >= self.max_clients {
            tracing::warn!(
                client = ?addr,
                max_clients = self.max_clients,
                "Reached max number of clients"
            );
            return Registration::Full;
        }

        tracing::info!(
            client = ?addr,
            clients = self.clients.len() + 1,
            "Client registered"
        );
        self.clients.push(ClientEntry::new(addr));
        Registration::Added
    }

    /// Send one frame to every client
    ///
    /// A client whose send fails is removed. A client whose receive queue is
    /// full misses this frame but stays registered. Returns the number of
    /// clients the frame was delivered to.
    pub fn broadcast<S: DatagramSink<A> + ?Sized>(&mut self, sink: &S, data: &[u8]) -> usize {
        let mut delivered = 0;
        let mut evicted = 0;

        self.clients.retain_mut(|client| match sink.try_send_to(data, &client.addr) {
            Ok(_) => {
                client.frames_sent += 1;
                delivered += 1;
                true
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                client.frames_skipped += 1;
                tracing::debug!(client = ?client.addr, "Client busy, frame skipped");
                true
            }
            Err(e) => {
                tracing::info!(
                    client = ?client.addr,
                    error = %e,
                    frames_sent = client.frames_sent,
                    "Client removed"
                );
                evicted += 1;
                false
            }
        });

        self.evictions += evicted;
        delivered
    }

    /// Whether an address is registered
    pub fn contains(&self, addr: &A) -> bool {
        self.clients.iter().any(|c| &c.addr == addr)
    }

    /// Registered clients
    pub fn clients(&self) -> impl Iterator<Item = &ClientEntry<A>> {
        self.clients.iter()
    }

    /// Number of registered clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no client is registered
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Capacity
    pub fn max_clients(&self) -> usize {
        self.max_clients
    }

    /// Clients evicted so far
    pub fn evictions(&self) -> u64 {
        self.evictions
    }
}

impl<A: PartialEq + Debug> Default for ClientRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}
