//! framecast
//!
//! Reassembles the chunked output of a camera's JPEG encoder into whole
//! frames and distributes them: to a local output with one of several
//! framings, and as datagrams to any number of local subscribers. The
//! camera can be reconfigured while running from the command line, a config
//! file, the control stream or subscriber datagrams.
//!
//! # Example
//! ```no_run
//! use framecast::capture::SyntheticCapture;
//! use framecast::config::ConfigStore;
//! use framecast::server::{FrameServer, ServerConfig};
//!
//! # async fn example() -> framecast::Result<()> {
//! let store = ConfigStore::with_defaults();
//! let config = ServerConfig::with_socket("/tmp/framecast_socket");
//!
//! let server = FrameServer::bind(config, store, SyntheticCapture::new()).await?;
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod client;
pub mod config;
pub mod control;
pub mod error;
pub mod frame;
pub mod output;
pub mod registry;
pub mod server;
pub mod stats;

pub use capture::{CaptureControl, CaptureSettings, SyntheticCapture};
pub use client::FrameClient;
pub use config::{ConfigStore, OriginContext};
pub use error::{Error, Result};
pub use frame::{Chunk, ChunkReassembler, Frame};
pub use output::{FramingEncoder, FramingMode};
pub use registry::ClientRegistry;
pub use server::{FrameServer, ServerConfig};
