//! Subscriber entry types

use std::time::Instant;

/// One subscribed client
#[derive(Debug, Clone)]
pub struct ClientEntry<A> {
    /// Where frames are sent
    pub addr: A,

    /// When the client last sent a request
    pub last_contact: Instant,

    /// When the client first registered
    pub registered_at: Instant,

    /// Frames delivered to this client
    pub frames_sent: u64,

    /// Frames skipped because the client's queue was full
    pub frames_skipped: u64,
}

impl<A> ClientEntry<A> {
    pub(super) fn new(addr: A) -> Self {
        let now = Instant::now();
        Self {
            addr,
            last_contact: now,
            registered_at: now,
            frames_sent: 0,
            frames_skipped: 0,
        }
    }
}

/// Result of registering a client address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// New client, added to the registry
    Added,
    /// Known client, contact time updated
    Refreshed,
    /// No room; the request is still processed but no frames are sent
    Full,
}
