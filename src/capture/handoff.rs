//! Producer to event loop handoff
//!
//! A bounded tokio channel. The producer side is synchronous and never
//! waits; a full queue sets a shared overflow flag instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use super::CaptureError;
use crate::error::{Error, Result};
use crate::frame::Chunk;

/// Default handoff queue depth
pub const DEFAULT_HANDOFF_CAPACITY: usize = 64;

/// One item on the handoff queue
#[derive(Debug)]
pub enum Handoff {
    /// Encoded data
    Chunk(Chunk),
    /// The pipeline failed
    Fault(CaptureError),
}

/// Create a handoff queue
pub fn handoff(capacity: usize) -> (ChunkSender, ChunkReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let overflowed = Arc::new(AtomicBool::new(false));

    (
        ChunkSender {
            tx,
            overflowed: Arc::clone(&overflowed),
        },
        ChunkReceiver { rx, overflowed },
    )
}

/// Producer half, cloned into each pipeline run
#[derive(Debug, Clone)]
pub struct ChunkSender {
    tx: mpsc::Sender<Handoff>,
    overflowed: Arc<AtomicBool>,
}

impl ChunkSender {
    /// Queue a chunk without waiting
    ///
    /// Returns false if the chunk could not be queued, either because the
    /// queue is full (the overflow flag is raised) or the loop has gone.
    pub fn push(&self, chunk: Chunk) -> bool {
        match self.tx.try_send(Handoff::Chunk(chunk)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.overflowed.store(true, Ordering::Release);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Report a pipeline failure
    pub fn fault(&self, error: CaptureError) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.tx.try_send(Handoff::Fault(error)) {
            self.overflowed.store(true, Ordering::Release);
        }
    }

    /// Whether the receiving side has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Event loop half
#[derive(Debug)]
pub struct ChunkReceiver {
    rx: mpsc::Receiver<Handoff>,
    overflowed: Arc<AtomicBool>,
}

impl ChunkReceiver {
    /// Wait for the next chunk
    ///
    /// Cancel safe. Fails on overflow, on a reported fault, or when every
    /// sender is gone.
    pub async fn recv(&mut self) -> Result<Chunk> {
        if self.overflowed.load(Ordering::Acquire) {
            return Err(Error::HandoffOverflow);
        }

        match self.rx.recv().await {
            Some(Handoff::Chunk(chunk)) => Ok(chunk),
            Some(Handoff::Fault(e)) => Err(e.into()),
            None => Err(Error::CaptureStopped),
        }
    }

    /// Discard everything queued so far
    pub fn drain(&mut self) -> usize {
        let mut drained = 0;
        while self.rx.try_recv().is_ok() {
            drained += 1;
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[tokio::test]
    async fn test_chunks_arrive_in_order() {
        let (tx, mut rx) = handoff(4);

        assert!(tx.push(Chunk::partial(Bytes::from_static(b"ab"))));
        assert!(tx.push(Chunk::frame_end(Bytes::from_static(b"cd"))));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.data, Bytes::from_static(b"ab"));
        assert!(!first.is_frame_end);
        assert!(second.is_frame_end);
    }

    #[tokio::test]
    async fn test_full_queue_is_fatal() {
        let (tx, mut rx) = handoff(1);

        assert!(tx.push(Chunk::frame_end(Bytes::from_static(b"a"))));
        assert!(!tx.push(Chunk::frame_end(Bytes::from_static(b"b"))));

        assert!(matches!(rx.recv().await, Err(Error::HandoffOverflow)));
    }

    #[tokio::test]
    async fn test_fault_is_reported() {
        let (tx, mut rx) = handoff(4);

        tx.fault(CaptureError::Device("sensor timeout".into()));

        assert!(matches!(
            rx.recv().await,
            Err(Error::Capture(CaptureError::Device(_)))
        ));
    }

    #[tokio::test]
    async fn test_all_senders_dropped() {
        let (tx, mut rx) = handoff(4);
        drop(tx);

        assert!(matches!(rx.recv().await, Err(Error::CaptureStopped)));
    }

    #[tokio::test]
    async fn test_drain() {
        let (tx, mut rx) = handoff(4);
        tx.push(Chunk::partial(Bytes::from_static(b"a")));
        tx.push(Chunk::partial(Bytes::from_static(b"b")));

        assert_eq!(rx.drain(), 2);
        assert!(!tx.is_closed());
        drop(rx);
        assert!(tx.is_closed());
    }
}
