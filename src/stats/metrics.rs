//! Statistics for server and client sessions

use std::time::{Duration, Instant};

/// Server-wide statistics
#[derive(Debug, Clone)]
pub struct ServerStats {
    /// When the event loop started
    pub started_at: Instant,
    /// Frames written to the local output (or framed, when there is none)
    pub frames_emitted: u64,
    /// Frames lost to assembly buffer overflow
    pub frames_dropped: u64,
    /// Overflow episodes (one diagnostic each)
    pub overflow_episodes: u64,
    /// Bytes written to the local output
    pub bytes_written: u64,
    /// Datagrams received on the control socket
    pub datagrams_received: u64,
    /// Frame datagrams delivered to clients
    pub frames_delivered: u64,
    /// Clients evicted after a failed send
    pub clients_evicted: u64,
    /// Capture pipeline restarts
    pub restarts: u64,
}

impl ServerStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            frames_emitted: 0,
            frames_dropped: 0,
            overflow_episodes: 0,
            bytes_written: 0,
            datagrams_received: 0,
            frames_delivered: 0,
            clients_evicted: 0,
            restarts: 0,
        }
    }

    /// Time since the event loop started
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Average frames per second since start
    pub fn frame_rate(&self) -> f64 {
        let secs = self.uptime().as_secs_f64();
        if secs > 0.0 {
            self.frames_emitted as f64 / secs
        } else {
            0.0
        }
    }

    /// Output bitrate in bits per second
    pub fn bitrate(&self) -> u64 {
        let secs = self.uptime().as_secs();
        if secs > 0 {
            (self.bytes_written * 8) / secs
        } else {
            0
        }
    }

    /// Emit a summary at shutdown
    pub fn log_summary(&self) {
        tracing::info!(
            uptime_secs = self.uptime().as_secs(),
            frames = self.frames_emitted,
            dropped = self.frames_dropped,
            overflows = self.overflow_episodes,
            bytes = self.bytes_written,
            delivered = self.frames_delivered,
            evicted = self.clients_evicted,
            datagrams = self.datagrams_received,
            restarts = self.restarts,
            "Server stopped"
        );
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Client-mode statistics
#[derive(Debug, Clone, Default)]
pub struct ClientStats {
    /// Frames received from the server
    pub frames_received: u64,
    /// Bytes received from the server
    pub bytes_received: u64,
    /// Datagrams dropped because they came from someone else
    pub foreign_datagrams: u64,
}

impl ClientStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Average frame size in bytes
    pub fn average_frame_size(&self) -> u64 {
        if self.frames_received > 0 {
            self.bytes_received / self.frames_received
        } else {
            0
        }
    }
}
