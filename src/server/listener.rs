//! Server event loop
//!
//! One task multiplexes every event source; nothing else touches the state.
//!
//! ```text
//!        capture thread      clients           stdin / inetd socket
//!              │                │                      │
//!        ChunkReceiver    UnixDatagram         ControlStream
//!              │                │                      │
//!              └────────► select! (biased) ◄───────────┘
//!                               │
//!                 ┌─────────────┼──────────────┐
//!                 ▼             ▼              ▼
//!            reassemble   register + apply   apply / HTTP
//!                 │
//!        broadcast + write output
//! ```
//!
//! The loop ends when the frame count runs out, a `quit` arrives, the
//! control stream closes or the shutdown future resolves. Nothing arriving
//! at all within the liveness timeout is fatal.

use std::future::Future;
use std::io;
use std::os::fd::AsFd;
use std::path::Path;

use tokio::io::AsyncRead;
use tokio::net::UnixDatagram;

use crate::capture::CaptureControl;
use crate::config::ConfigStore;
use crate::control::{control_stream, next_message, ControlCodec, ControlStream};
use crate::error::{Error, Result};
use crate::server::config::ServerConfig;
use crate::server::state::ServerState;
use crate::stats::ServerStats;

/// Frame distribution server
pub struct FrameServer<C: CaptureControl> {
    config: ServerConfig,
    state: ServerState<C>,
    socket: UnixDatagram,
    /// Blocking-API handle on the same descriptor for non-blocking fan-out
    clients: std::os::unix::net::UnixDatagram,
    control: Option<ControlStream>,
}

impl<C: CaptureControl> FrameServer<C> {
    /// Bind the control socket and open the output
    ///
    /// A stale socket file left by a previous run is removed first.
    pub async fn bind(config: ServerConfig, store: ConfigStore, capture: C) -> Result<Self> {
        remove_socket(&config.socket_path)?;
        let socket = UnixDatagram::bind(&config.socket_path)?;
        let clients = fan_out_handle(&socket)?;

        let state = match ServerState::new(store, capture, &config).await {
            Ok(state) => state,
            Err(e) => {
                let _ = remove_socket(&config.socket_path);
                return Err(e);
            }
        };

        tracing::info!(socket = %config.socket_path.display(), "Server listening");

        Ok(Self {
            config,
            state,
            socket,
            clients,
            control: None,
        })
    }

    /// Read configuration requests from a byte stream as well
    ///
    /// The stream is decoded in the shape of the current output framing and
    /// follows it when a request changes the framing.
    pub fn with_control<R>(mut self, reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let codec =
            ControlCodec::for_framing(self.state.encoder().mode(), self.config.request_buffer_size);
        self.control = Some(control_stream(reader, codec));
        self
    }

    /// Path clients send to
    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }

    /// Current state
    pub fn state(&self) -> &ServerState<C> {
        &self.state
    }

    /// Run until the session ends on its own
    pub async fn run(self) -> Result<ServerStats> {
        self.run_until(std::future::pending()).await
    }

    /// Run with graceful shutdown
    ///
    /// Capture is stopped and the socket file removed however the loop ends.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<ServerStats>
    where
        F: Future<Output = ()>,
    {
        let result = match self.state.start().await {
            Ok(()) => self.event_loop(shutdown).await,
            Err(e) => Err(e),
        };

        self.state.shutdown();
        if let Err(e) = remove_socket(&self.config.socket_path) {
            tracing::warn!(error = %e, "Failed to remove socket");
        }

        let stats = self.state.stats();
        stats.log_summary();
        result.map(|()| stats)
    }

    async fn event_loop<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut buf = vec![0u8; self.config.assembly_capacity];
        let liveness = self.config.liveness_timeout;

        while !self.state.is_finished() {
            tokio::select! {
                biased;

                chunk = self.state.next_chunk() => {
                    self.state.handle_chunk(chunk?, &self.clients).await?;
                }

                received = self.socket.recv_from(&mut buf) => {
                    let (len, addr) = received?;
                    let from = addr.as_pathname().map(Path::to_path_buf);
                    tracing::debug!(len, from = ?from, "Datagram received");
                    self.state.handle_datagram(from, &buf[..len])?;
                }

                message = next_message(&mut self.control) => match message {
                    Some(Ok(message)) => self.state.handle_control(message).await?,
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        tracing::info!("Control stream closed");
                        return Ok(());
                    }
                },

                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received");
                    return Ok(());
                }

                _ = tokio::time::sleep(liveness) => {
                    return Err(Error::LivenessTimeout);
                }
            }

            self.follow_framing();
        }

        Ok(())
    }

    fn follow_framing(&mut self) {
        let Some(control) = self.control.as_mut() else {
            return;
        };
        let mode = self.state.encoder().mode();
        if control.decoder_mut().reframe(mode) {
            tracing::info!(framing = %mode, "Control stream follows new framing");
        }
    }
}

/// Duplicate the socket descriptor for fan-out sends
///
/// The duplicate shares the open file description, including the
/// `O_NONBLOCK` flag tokio set on it, so `send_to` on the std handle never
/// blocks and a full receiver queue surfaces as `WouldBlock`.
fn fan_out_handle(socket: &UnixDatagram) -> Result<std::os::unix::net::UnixDatagram> {
    let fd = socket.as_fd().try_clone_to_owned()?;
    Ok(std::os::unix::net::UnixDatagram::from(fd))
}

fn remove_socket(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::capture::SyntheticCapture;
    use crate::config::{parse_lines, OriginContext};
    use crate::control::ControlError;

    fn store(lines: &str) -> ConfigStore {
        let mut store = ConfigStore::new();
        parse_lines(&mut store, lines, OriginContext::CommandLine).unwrap();
        store.fill_defaults();
        store
    }

    #[tokio::test]
    async fn test_bind_replaces_stale_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sock");
        std::fs::write(&path, b"stale").unwrap();

        let config = ServerConfig::with_socket(&path);
        let server = FrameServer::bind(config, store(""), SyntheticCapture::new())
            .await
            .unwrap();

        assert_eq!(server.socket_path(), path);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_count_ends_session_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sock");
        let output = dir.path().join("out.mjpeg");

        let config = ServerConfig::with_socket(&path);
        let lines = format!("count=3\noutput={}\n", output.display());
        let server = FrameServer::bind(config, store(&lines), SyntheticCapture::new())
            .await
            .unwrap();

        let stats = server.run().await.unwrap();

        assert_eq!(stats.frames_emitted, 3);
        assert!(!path.exists());
        let written = std::fs::read(&output).unwrap();
        assert_eq!(written.iter().filter(|&&b| b == 0xD9).count(), 3);
    }

    #[tokio::test]
    async fn test_shutdown_future() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sock");
        let config = ServerConfig::with_socket(&path);
        let server = FrameServer::bind(config, store(""), SyntheticCapture::new())
            .await
            .unwrap();

        let stats = server
            .run_until(tokio::time::sleep(Duration::from_millis(100)))
            .await
            .unwrap();

        assert!(!path.exists());
        assert_eq!(stats.clients_evicted, 0);
    }

    #[tokio::test]
    async fn test_fan_out_handle_does_not_block() {
        let dir = tempfile::tempdir().unwrap();
        let socket = UnixDatagram::bind(dir.path().join("sock")).unwrap();
        let peer_path = dir.path().join("peer");
        let _peer = std::os::unix::net::UnixDatagram::bind(&peer_path).unwrap();

        let clients = fan_out_handle(&socket).unwrap();
        let payload = [0u8; 1024];
        let full = (0..100_000)
            .map(|_| clients.send_to(&payload, &peer_path))
            .find_map(|sent| sent.err())
            .unwrap();

        assert_eq!(full.kind(), io::ErrorKind::WouldBlock);
    }

    #[tokio::test]
    async fn test_control_buffer_follows_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::with_socket(dir.path().join("sock")).request_buffer_size(16);
        let mock = tokio_test::io::Builder::new().read(&[b'a'; 100]).build();

        let server = FrameServer::bind(config, store(""), SyntheticCapture::new())
            .await
            .unwrap()
            .with_control(mock);
        let err = server.run().await.unwrap_err();

        assert!(matches!(
            err,
            Error::Control(ControlError::LineTooLong { max: 16 })
        ));
    }

    #[tokio::test]
    async fn test_control_stream_follows_framing() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::with_socket(dir.path().join("sock"));
        let mock = tokio_test::io::Builder::new()
            .read(b"framing=header\n")
            .read(&[0, 0, 0, 4])
            .read(b"quit")
            .wait(Duration::from_secs(10))
            .build();

        let server = FrameServer::bind(config, store(""), SyntheticCapture::new())
            .await
            .unwrap()
            .with_control(mock);

        // Read as a line, the packet would sit unterminated until the wait ends
        tokio::time::timeout(Duration::from_secs(2), server.run())
            .await
            .unwrap()
            .unwrap();
    }
}
