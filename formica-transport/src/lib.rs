//! Renderer boundary: turns scene events and snapshots into frames,
//! serializes them and ships them out of the process.

use std::io::{self, Write};

use formica_config::{SenderType, SerializerType, TransportConfig};
use formica_core::{Calendar, RenderSnapshot, SceneEvent};
use log::{debug, trace};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("json serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("binary serialization failed: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Everything a renderer learns about one tick: the mount/dismount events
/// drained since the previous frame plus the full object snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub tick: u64,
    pub calendar: Calendar,
    pub events: Vec<SceneEvent>,
    pub objects: Vec<RenderSnapshot>,
}

/// Serializes a frame into one line of text.
pub trait Serializer: Send + Sync {
    fn serialize(&self, frame: &Frame) -> Result<String>;
}

/// Sends serialized data to a destination.
pub trait Sender {
    fn send(&mut self, data: &[u8]) -> Result<()>;
}

pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, frame: &Frame) -> Result<String> {
        Ok(serde_json::to_string(frame)?)
    }
}

/// `bincode` bytes wrapped in base64 so frames stay line-oriented.
pub struct BinarySerializer;

impl Serializer for BinarySerializer {
    fn serialize(&self, frame: &Frame) -> Result<String> {
        let bytes = bincode::serialize(frame)?;
        Ok(base64::encode(bytes))
    }
}

/// Produces nothing. Useful for headless runs.
pub struct NullSerializer;

impl Serializer for NullSerializer {
    fn serialize(&self, _frame: &Frame) -> Result<String> {
        Ok(String::new())
    }
}

/// Writes each payload to stdout followed by a newline.
pub struct StdioSender {
    stdout: io::Stdout,
}

impl StdioSender {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
        }
    }
}

impl Default for StdioSender {
    fn default() -> Self {
        Self::new()
    }
}

impl Sender for StdioSender {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut handle = self.stdout.lock();
        handle.write_all(data)?;
        handle.write_all(b"\n")?;
        handle.flush()?;
        Ok(())
    }
}

pub struct NullSender;

impl Sender for NullSender {
    fn send(&mut self, _data: &[u8]) -> Result<()> {
        Ok(())
    }
}

pub fn create_serializer(serializer_type: SerializerType) -> Box<dyn Serializer> {
    match serializer_type {
        SerializerType::Json => Box::new(JsonSerializer),
        SerializerType::Binary => Box::new(BinarySerializer),
        SerializerType::Null => Box::new(NullSerializer),
    }
}

pub fn create_sender(sender_type: SenderType) -> Box<dyn Sender> {
    match sender_type {
        SenderType::Stdio => Box::new(StdioSender::new()),
        SenderType::Null => Box::new(NullSender),
    }
}

/// Serializer plus sender, emitting once every `every_ticks` ticks.
///
/// Events are buffered between emitted frames so a throttled renderer
/// still sees every mount and dismount.
pub struct TransportController {
    serializer: Box<dyn Serializer>,
    sender: Box<dyn Sender>,
    every_ticks: u64,
    pending: Vec<SceneEvent>,
    sent: u64,
}

impl TransportController {
    pub fn new(serializer: Box<dyn Serializer>, sender: Box<dyn Sender>, every_ticks: u32) -> Self {
        Self {
            serializer,
            sender,
            every_ticks: u64::from(every_ticks.max(1)),
            pending: Vec::new(),
            sent: 0,
        }
    }

    pub fn from_config(config: &TransportConfig) -> Self {
        debug!(
            "transport: {:?} serializer, {:?} sender, every {} ticks",
            config.serializer.serializer_type, config.sender.sender_type, config.every_ticks
        );
        Self::new(
            create_serializer(config.serializer.serializer_type),
            create_sender(config.sender.sender_type),
            config.every_ticks,
        )
    }

    /// Frames sent so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Queues `events` and, on an emitting tick, sends a frame built from
    /// everything queued plus `objects`. Returns whether a frame went out.
    pub fn publish<F>(
        &mut self,
        tick: u64,
        calendar: Calendar,
        events: Vec<SceneEvent>,
        objects: F,
    ) -> Result<bool>
    where
        F: FnOnce() -> Vec<RenderSnapshot>,
    {
        self.pending.extend(events);
        if tick % self.every_ticks != 0 {
            return Ok(false);
        }
        let frame = Frame {
            tick,
            calendar,
            events: std::mem::take(&mut self.pending),
            objects: objects(),
        };
        let data = self.serializer.serialize(&frame)?;
        if data.is_empty() {
            return Ok(false);
        }
        self.sender.send(data.as_bytes())?;
        self.sent += 1;
        trace!("frame {} sent ({} bytes)", tick, data.len());
        Ok(true)
    }
}
