//! Server state
//!
//! Everything the event loop mutates lives here and is owned by the loop's
//! task; nothing is shared. Configuration requests reach it through
//! [`ConfigTarget`], frames through [`ServerState::handle_chunk`].

use std::path::PathBuf;

use crate::capture::handoff::{handoff, ChunkReceiver, ChunkSender};
use crate::capture::CaptureControl;
use crate::config::{
    parse_line, parse_lines, ConfigOption, ConfigStore, ConfigTarget, Effect, OriginContext,
    OPTIONS,
};
use crate::control::ControlMessage;
use crate::error::Result;
use crate::frame::{Chunk, ChunkReassembler, Frame};
use crate::output::http::{self, HttpOutcome};
use crate::output::{Emission, FramingEncoder, OutputSink};
use crate::registry::{ClientRegistry, DatagramSink};
use crate::server::config::ServerConfig;
use crate::stats::ServerStats;

/// State owned by the event loop
pub struct ServerState<C: CaptureControl> {
    store: ConfigStore,
    reassembler: ChunkReassembler,
    encoder: FramingEncoder,
    registry: ClientRegistry<PathBuf>,
    sink: OutputSink,
    capture: C,
    sender: ChunkSender,
    receiver: ChunkReceiver,
    /// Frames left before shutdown (-1 = unlimited)
    remaining: i64,
    stats: ServerStats,
}

impl<C: CaptureControl> ServerState<C> {
    /// Build the state from staged configuration
    ///
    /// Opens the local output but does not start capture.
    pub async fn new(store: ConfigStore, capture: C, config: &ServerConfig) -> Result<Self> {
        let framing = store.framing();
        let sink = OutputSink::open(store.text("output"), framing).await?;
        let encoder = FramingEncoder::new(framing).channel(store.channel());
        let (sender, receiver) = handoff(config.handoff_capacity);
        let remaining = store.int("count");

        Ok(Self {
            store,
            reassembler: ChunkReassembler::with_capacity(config.assembly_capacity),
            encoder,
            registry: ClientRegistry::with_capacity(config.max_clients),
            sink,
            capture,
            sender,
            receiver,
            remaining,
            stats: ServerStats::new(),
        })
    }

    /// Start capture, apply the staged configuration and write the output
    /// preamble
    pub async fn start(&mut self) -> Result<()> {
        let settings = self.store.capture_settings();
        self.capture.start(&settings, self.sender.clone())?;

        for option in OPTIONS {
            if option.is_stored() && self.store.is_set(option.name) {
                self.apply(option, OriginContext::ProcessStart)?;
            }
        }
        if self.store.quit_requested() {
            self.remaining = 0;
        }

        let preamble = self.encoder.open();
        if !preamble.is_empty() {
            self.sink.write_parts(&preamble).await?;
        }

        tracing::info!(
            framing = %self.encoder.mode(),
            output = %self.sink.path().display(),
            count = self.remaining,
            "Server started"
        );
        Ok(())
    }

    /// Stop capture
    pub fn shutdown(&mut self) {
        self.capture.stop();
    }

    /// Wait for the next chunk from the producer (cancel safe)
    pub async fn next_chunk(&mut self) -> Result<Chunk> {
        self.receiver.recv().await
    }

    /// Feed a chunk; a completed frame is broadcast and written out
    pub async fn handle_chunk<S>(&mut self, chunk: Chunk, clients: &S) -> Result<()>
    where
        S: DatagramSink<PathBuf> + ?Sized,
    {
        match self.reassembler.submit(chunk) {
            Some(frame) => self.emit(frame, clients).await,
            None => Ok(()),
        }
    }

    async fn emit<S>(&mut self, frame: Frame, clients: &S) -> Result<()>
    where
        S: DatagramSink<PathBuf> + ?Sized,
    {
        if self.is_finished() {
            return Ok(());
        }

        let delivered = self.registry.broadcast(clients, frame.data());
        self.stats.frames_delivered += delivered as u64;

        let emission = self.encoder.render(&frame);
        if emission == Emission::Skip {
            return Ok(());
        }

        self.sink.write(&emission).await?;
        if !self.sink.is_none() {
            self.stats.bytes_written += emission.len() as u64;
        }
        self.stats.frames_emitted += 1;

        if self.remaining > 0 {
            self.remaining -= 1;
            if self.remaining == 0 {
                tracing::info!("Frame count reached");
            }
        }
        Ok(())
    }

    /// Register the sender and apply the datagram's config lines
    pub fn handle_datagram(&mut self, from: Option<PathBuf>, data: &[u8]) -> Result<()> {
        self.stats.datagrams_received += 1;

        match from {
            Some(addr) => {
                self.registry.register(addr);
            }
            None => tracing::debug!("Datagram from unbound sender, not registered"),
        }

        let text = String::from_utf8_lossy(data);
        parse_lines(self, &text, OriginContext::ClientRequest)
    }

    /// Apply one message from the control stream
    pub async fn handle_control(&mut self, message: ControlMessage) -> Result<()> {
        match message {
            ControlMessage::Line(line) => parse_line(self, &line, OriginContext::ClientRequest),
            ControlMessage::Packet(packet) => {
                let text = String::from_utf8_lossy(&packet);
                parse_lines(self, &text, OriginContext::ClientRequest)
            }
            ControlMessage::Request(request) => {
                let outcome = http::respond(&request, &mut self.encoder, &mut self.sink).await?;
                if outcome == HttpOutcome::Close {
                    self.remaining = 0;
                }
                Ok(())
            }
        }
    }

    /// Stop, drain and start the pipeline with the current settings
    pub fn restart_capture(&mut self) -> Result<()> {
        self.capture.stop();
        let stale = self.receiver.drain();
        self.reassembler.reset();

        let settings = self.store.capture_settings();
        self.capture.start(&settings, self.sender.clone())?;
        self.stats.restarts += 1;

        tracing::info!(
            width = settings.width,
            height = settings.height,
            fps = settings.fps,
            discarded_chunks = stale,
            "Capture restarted"
        );
        Ok(())
    }

    /// Whether the session should end
    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    /// Frames left before shutdown (-1 = unlimited)
    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    /// Current configuration
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Subscribers
    pub fn registry(&self) -> &ClientRegistry<PathBuf> {
        &self.registry
    }

    /// Local output framing
    pub fn encoder(&self) -> &FramingEncoder {
        &self.encoder
    }

    /// Capture pipeline
    pub fn capture(&self) -> &C {
        &self.capture
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> ServerStats {
        let mut stats = self.stats.clone();
        stats.frames_dropped = self.reassembler.frames_dropped();
        stats.overflow_episodes = self.reassembler.overflow_episodes();
        stats.clients_evicted = self.registry.evictions();
        stats
    }
}

impl<C: CaptureControl> ConfigTarget for ServerState<C> {
    fn store_mut(&mut self) -> &mut ConfigStore {
        &mut self.store
    }

    fn apply(&mut self, option: &'static ConfigOption, ctx: OriginContext) -> Result<()> {
        match option.effect {
            Effect::None => {}
            Effect::Camera(setting) => {
                if let Some(property) = self.store.property(setting) {
                    self.capture.set_property(property)?;
                }
            }
            // Startup values were used when the pipeline was started
            Effect::Restart if ctx == OriginContext::ProcessStart => {}
            Effect::Restart => self.restart_capture()?,
            Effect::Framing => self.encoder.set_mode(self.store.framing()),
            Effect::Channel => self.encoder.set_channel(self.store.channel()),
            Effect::Count => self.remaining = self.store.int("count"),
            Effect::Quit => {
                tracing::info!("Quit requested");
                self.remaining = 0;
            }
            Effect::Help => tracing::debug!("Ignoring help request"),
        }
        Ok(())
    }
}
