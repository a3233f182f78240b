//! Client mode
//!
//! A second process can subscribe to a running server: it sends its queued
//! config lines from a socket of its own and receives every frame back as a
//! datagram.

pub mod receiver;

pub use receiver::{client_path, FrameClient, DEFAULT_SERVER_TIMEOUT};
