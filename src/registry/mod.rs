//! Subscriber registry
//!
//! Any process that sends a datagram to the control socket from a bound
//! address becomes a subscriber and receives every subsequent frame as one
//! datagram.
//!
//! # Architecture
//!
//! ```text
//!            recv_from(addr)                      frame
//!                  │                                │
//!                  ▼                                ▼
//!     ┌──────────────────────────┐      ┌──────────────────────┐
//!     │ register(addr)           │      │ broadcast(sink, buf) │
//!     │  known? refresh          │      │  Ok         → keep   │
//!     │  room?  add              │      │  WouldBlock → skip   │
//!     │  else   Full (warn)      │      │  Err        → evict  │
//!     └──────────────────────────┘      └──────────────────────┘
//! ```
//!
//! # Zero-Copy Design
//!
//! The frame handed to `broadcast` is a `bytes::Bytes` shared with the local
//! output; each client gets a `sendto` of the same buffer.

pub mod entry;
pub mod store;

pub use entry::{ClientEntry, Registration};
pub use store::{ClientRegistry, DatagramSink, MAX_CLIENTS};
