//! Frame distribution server
//!
//! Owns the capture pipeline, the subscriber registry and the local output,
//! and runs the single event loop that ties them together.

pub mod config;
pub mod listener;
pub mod state;

pub use config::{ServerConfig, DEFAULT_SOCKET_PATH};
pub use listener::FrameServer;
pub use state::ServerState;
