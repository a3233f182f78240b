//! Client mode
//!
//! Sends queued config lines to a running server and writes the frames it
//! broadcasts back to the local output.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UnixDatagram;

use crate::config::{ConfigError, ConfigStore};
use crate::control::{next_message, ControlMessage, ControlStream};
use crate::error::{Error, Result};
use crate::frame::{Frame, MAX_DATA_BUFFER_SIZE};
use crate::output::http::{self, HttpOutcome};
use crate::output::{Emission, FramingEncoder, OutputSink};
use crate::stats::ClientStats;

/// How long the server may stay silent while frames are expected
pub const DEFAULT_SERVER_TIMEOUT: Duration = Duration::from_secs(2);

/// Frame subscriber
///
/// # Example
/// ```no_run
/// use framecast::client::FrameClient;
/// use framecast::config::ConfigStore;
///
/// # async fn example() -> framecast::Result<()> {
/// let mut store = ConfigStore::with_defaults();
/// framecast::config::parse_lines(
///     &mut store,
///     "output=/tmp/frames.mjpeg\ncount=10",
///     framecast::config::OriginContext::CommandLine,
/// )?;
///
/// let client = FrameClient::connect(&store).await?;
/// let stats = client.run().await?;
/// println!("{} frames", stats.frames_received);
/// # Ok(())
/// # }
/// ```
pub struct FrameClient {
    socket: UnixDatagram,
    local_path: PathBuf,
    server_path: PathBuf,
    request: String,
    encoder: FramingEncoder,
    sink: OutputSink,
    remaining: i64,
    timeout: Duration,
    control: Option<ControlStream>,
    stats: ClientStats,
}

impl FrameClient {
    /// Bind a per-process socket next to the server's and open the output
    ///
    /// Without an output the client only delivers its send list, so having
    /// neither is an error.
    pub async fn connect(store: &ConfigStore) -> Result<Self> {
        let sink = OutputSink::open(store.text("output"), store.framing()).await?;
        let remaining = if sink.is_none() {
            if store.send_list().is_empty() {
                return Err(ConfigError::Conflict(
                    "No sends and no place to store output, so nothing to do",
                )
                .into());
            }
            0
        } else if store.quit_requested() {
            0
        } else {
            store.int("count")
        };

        let server_path = PathBuf::from(store.text("socket"));
        let local_path = client_path(&server_path, std::process::id());
        remove_stale(&local_path)?;
        let socket = UnixDatagram::bind(&local_path)?;

        tracing::debug!(
            local = %local_path.display(),
            server = %server_path.display(),
            "Client socket bound"
        );

        Ok(Self {
            socket,
            local_path,
            server_path,
            request: store.send_list().join("\n"),
            encoder: FramingEncoder::new(store.framing()).channel(store.channel()),
            sink,
            remaining,
            timeout: DEFAULT_SERVER_TIMEOUT,
            control: None,
            stats: ClientStats::new(),
        })
    }

    /// Set how long the server may stay silent
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Serve an HTTP request from this stream (`http` framing)
    pub fn with_control(mut self, control: ControlStream) -> Self {
        self.control = Some(control);
        self
    }

    /// Local socket path
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Run until the count is reached or the control stream closes
    pub async fn run(self) -> Result<ClientStats> {
        self.run_until(std::future::pending()).await
    }

    /// Run with graceful shutdown
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<ClientStats>
    where
        F: Future<Output = ()>,
    {
        let result = self.session(shutdown).await;

        if let Err(e) = remove_stale(&self.local_path) {
            tracing::warn!(error = %e, "Failed to remove client socket");
        }

        tracing::info!(
            frames = self.stats.frames_received,
            bytes = self.stats.bytes_received,
            foreign = self.stats.foreign_datagrams,
            "Client stopped"
        );
        result.map(|()| self.stats)
    }

    async fn session<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        // Always sent, even empty, so the server registers us
        self.socket
            .send_to(self.request.as_bytes(), &self.server_path)
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => {
                    Error::ServerNotRunning(self.server_path.clone())
                }
                _ => Error::Io(e),
            })?;

        let preamble = self.encoder.open();
        if !preamble.is_empty() {
            self.sink.write_parts(&preamble).await?;
        }

        tokio::pin!(shutdown);
        let mut buf = vec![0u8; MAX_DATA_BUFFER_SIZE];

        while self.remaining != 0 {
            tokio::select! {
                biased;

                received = self.socket.recv_from(&mut buf) => {
                    let (len, addr) = received?;
                    if addr.as_pathname() != Some(self.server_path.as_path()) {
                        tracing::warn!(from = ?addr.as_pathname(), "Dropping message from unexpected sender");
                        self.stats.foreign_datagrams += 1;
                        continue;
                    }
                    self.write_frame(Frame::new(Bytes::copy_from_slice(&buf[..len]))).await?;
                }

                message = next_message(&mut self.control) => match message {
                    Some(Ok(ControlMessage::Request(request))) => {
                        let outcome =
                            http::respond(&request, &mut self.encoder, &mut self.sink).await?;
                        if outcome == HttpOutcome::Close {
                            self.remaining = 0;
                        }
                    }
                    Some(Ok(other)) => tracing::debug!(message = ?other, "Ignoring control input"),
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

                _ = tokio::time::sleep(self.timeout) => {
                    return Err(Error::ServerUnresponsive);
                }
            }
        }

        Ok(())
    }

    async fn write_frame(&mut self, frame: Frame) -> Result<()> {
        let emission = self.encoder.render(&frame);
        if emission == Emission::Skip {
            return Ok(());
        }
        self.sink.write(&emission).await?;

        self.stats.frames_received += 1;
        self.stats.bytes_received += frame.len() as u64;
        if self.remaining > 0 {
            self.remaining -= 1;
        }
        Ok(())
    }
}

/// Per-process socket path derived from the server's
pub fn client_path(server: &Path, pid: u32) -> PathBuf {
    let mut path = server.as_os_str().to_owned();
    path.push(format!(".client.{pid}"));
    PathBuf::from(path)
}

fn remove_stale(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
