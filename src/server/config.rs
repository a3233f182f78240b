//! Server configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::capture::handoff::DEFAULT_HANDOFF_CAPACITY;
use crate::control::MAX_REQUEST_BUFFER_SIZE;
use crate::frame::MAX_DATA_BUFFER_SIZE;
use crate::registry::MAX_CLIENTS;

/// Default control socket path
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/framecast_socket";

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Unix datagram socket clients talk to
    pub socket_path: PathBuf,

    /// Largest frame that can be reassembled
    pub assembly_capacity: usize,

    /// Maximum concurrent subscribers
    pub max_clients: usize,

    /// Control stream carry-over buffer size
    pub request_buffer_size: usize,

    /// Fatal if nothing at all happens for this long
    pub liveness_timeout: Duration,

    /// Depth of the producer handoff queue
    pub handoff_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            assembly_capacity: MAX_DATA_BUFFER_SIZE,
            max_clients: MAX_CLIENTS,
            request_buffer_size: MAX_REQUEST_BUFFER_SIZE,
            liveness_timeout: Duration::from_secs(2),
            handoff_capacity: DEFAULT_HANDOFF_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Create a new config with a custom socket path
    pub fn with_socket(path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: path.into(),
            ..Default::default()
        }
    }

    /// Set the socket path
    pub fn socket(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = path.into();
        self
    }

    /// Set the assembly buffer capacity
    pub fn assembly_capacity(mut self, bytes: usize) -> Self {
        self.assembly_capacity = bytes;
        self
    }

    /// Set maximum subscribers
    pub fn max_clients(mut self, max: usize) -> Self {
        self.max_clients = max;
        self
    }

    /// Set the control stream buffer size
    pub fn request_buffer_size(mut self, bytes: usize) -> Self {
        self.request_buffer_size = bytes;
        self
    }

    /// Set the liveness timeout
    pub fn liveness_timeout(mut self, timeout: Duration) -> Self {
        self.liveness_timeout = timeout;
        self
    }

    /// Set the handoff queue depth
    pub fn handoff_capacity(mut self, depth: usize) -> Self {
        self.handoff_capacity = depth.max(1);
        self
    }
}
