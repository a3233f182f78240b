//! Chunk reassembly
//!
//! The encoder hands over a frame as a run of chunks, the last of which is
//! flagged as frame-terminal. Most frames fit in a single chunk and are passed
//! through without copying. Larger frames are accumulated in a bounded buffer.
//!
//! ```text
//!   chunk ──► empty && frame_end && fits? ──yes──► Frame (zero copy)
//!                      │ no
//!                      ▼
//!            len + chunk > capacity? ──yes──► warn once, drop until frame_end
//!                      │ no
//!                      ▼
//!                 append; frame_end? ──yes──► Frame (snapshot), reset
//! ```
//!
//! Memory stays bounded by the capacity. A frame that does not fit is lost
//! rather than growing the buffer.

use bytes::BytesMut;

use super::chunk::{Chunk, Frame};

/// Default assembly buffer capacity (128KB)
pub const MAX_DATA_BUFFER_SIZE: usize = 128 * 1024;

/// Reassembles chunks into frames
#[derive(Debug)]
pub struct ChunkReassembler {
    /// Partial frame
    buffer: BytesMut,
    /// Maximum frame size in bytes
    capacity: usize,
    /// Discarding chunks until the next frame end
    dropping: bool,
    /// Frames produced
    frames_assembled: u64,
    /// Frames lost to overflow
    frames_dropped: u64,
    /// Overflow episodes (one diagnostic each)
    overflow_episodes: u64,
}

impl ChunkReassembler {
    /// Create a reassembler with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(MAX_DATA_BUFFER_SIZE)
    }

    /// Create a reassembler with the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            capacity,
            dropping: false,
            frames_assembled: 0,
            frames_dropped: 0,
            overflow_episodes: 0,
        }
    }

    /// Feed one chunk, returning a frame when one completes
    pub fn submit(&mut self, chunk: Chunk) -> Option<Frame> {
        if self.dropping {
            if chunk.is_frame_end {
                self.reset();
            }
            return None;
        }

        if self.buffer.is_empty() && chunk.is_frame_end && chunk.len() <= self.capacity {
            self.frames_assembled += 1;
            return Some(Frame::new(chunk.data));
        }

        let needed = self.buffer.len() + chunk.len();
        if needed > self.capacity {
            self.overflow_episodes += 1;
            self.frames_dropped += 1;
            tracing::warn!(
                size = needed,
                capacity = self.capacity,
                "Frame too large, dropping"
            );

            if chunk.is_frame_end {
                self.reset();
            } else {
                self.buffer.clear();
                self.dropping = true;
            }
            return None;
        }

        self.buffer.extend_from_slice(&chunk.data);

        if chunk.is_frame_end {
            self.frames_assembled += 1;
            let data = self.buffer.split().freeze();
            return Some(Frame::new(data));
        }

        None
    }

    /// Discard any partial frame
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.dropping = false;
    }

    /// Bytes currently buffered
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Whether chunks are being discarded until the next frame end
    pub fn is_dropping(&self) -> bool {
        self.dropping
    }

    /// Maximum frame size
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames produced so far
    pub fn frames_assembled(&self) -> u64 {
        self.frames_assembled
    }

    /// Frames lost to overflow so far
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    /// Overflow diagnostics raised so far
    pub fn overflow_episodes(&self) -> u64 {
        self.overflow_episodes
    }
}

impl Default for ChunkReassembler {
    fn default() -> Self {
        Self::new()
    }
}
