//! Chunk and frame types
//!
//! A chunk is one fragment of an encoded image as produced by the capture
//! pipeline. A frame is one complete image, the unit that gets framed and
//! fanned out to subscribers.

use bytes::Bytes;

/// Fragment of an encoded image
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Encoded bytes (reference counted, released when dropped)
    pub data: Bytes,
    /// Whether this chunk terminates the current frame
    pub is_frame_end: bool,
}

impl Chunk {
    /// Create a chunk that continues the current frame
    pub fn partial(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            is_frame_end: false,
        }
    }

    /// Create a chunk that terminates the current frame
    pub fn frame_end(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            is_frame_end: true,
        }
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the chunk carries no data
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// One complete encoded image
///
/// Cheap to clone: every destination shares the same allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Bytes,
}

impl Frame {
    /// Wrap assembled bytes
    pub fn new(data: Bytes) -> Self {
        Self { data }
    }

    /// Frame bytes
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the frame is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consume the frame, returning its bytes
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
