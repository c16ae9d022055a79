//! Seams to the playback engine.
//!
//! The engine plays whatever an [`ObjectUrl`] names. For streamed sources it
//! hands out a [`PlaybackBuffer`], an append-only queue that absorbs one
//! window at a time and signals when it is ready for the next.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use crate::descriptor::Descriptor;
use crate::error::{Error, Result};
use crate::object_url::ObjectUrl;

/// Lifecycle notifications from the engine for the attached source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Enough of the source has been read to start playing.
    LoadedMetadata,
    /// Playback ran to the end.
    Ended,
    /// Playback failed.
    Error(String),
}

/// Receiving side of an attached source's events.
pub type EngineEvents = mpsc::UnboundedReceiver<EngineEvent>;

/// A playback engine.
#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    /// Whether the engine can decode a stream with this descriptor.
    fn is_type_supported(&self, descriptor: &Descriptor) -> bool;

    /// Make the object named by `url` the current source.
    ///
    /// For a stream object this returns once the source is open and ready
    /// for [`add_source_buffer`](Self::add_source_buffer).
    async fn attach(&self, url: &ObjectUrl) -> Result<EngineEvents>;

    /// Create the append buffer for the currently attached stream source.
    async fn add_source_buffer(&self, descriptor: &Descriptor) -> Result<Box<dyn PlaybackBuffer>>;

    /// Drop the current source and anything playing from it.
    async fn detach(&self);
}

/// The engine's append-only input queue for a streamed source.
///
/// Appending while [`is_updating`](Self::is_updating) is true is not allowed;
/// callers wait on [`ready`](Self::ready) first.
#[async_trait]
pub trait PlaybackBuffer: Send {
    /// Whether a previous append is still being absorbed.
    fn is_updating(&self) -> bool;

    /// Resolve once no append is in progress.
    async fn ready(&mut self) -> Result<()>;

    /// Begin absorbing `window`. The receipt resolves when it is fully absorbed.
    fn append(&mut self, window: Bytes) -> Result<AppendReceipt>;

    /// Mark the stream complete. No appends are accepted afterwards.
    async fn end_of_stream(&mut self) -> Result<()>;
}

/// Single-shot completion signal for one append.
#[derive(Debug)]
pub struct AppendReceipt {
    rx: oneshot::Receiver<Result<()>>,
}

/// Sending half of an [`AppendReceipt`], held by whoever absorbs the window.
#[derive(Debug)]
pub struct AppendSignal {
    tx: oneshot::Sender<Result<()>>,
}

impl AppendReceipt {
    /// Create a linked signal/receipt pair.
    pub fn channel() -> (AppendSignal, AppendReceipt) {
        let (tx, rx) = oneshot::channel();
        (AppendSignal { tx }, AppendReceipt { rx })
    }

    /// Wait until the window has been absorbed.
    pub async fn absorbed(self) -> Result<()> {
        self.rx.await.map_err(|_| Error::BufferClosed)?
    }
}

impl AppendSignal {
    /// Report the outcome of the append. A dropped receipt is ignored.
    pub fn complete(self, outcome: Result<()>) {
        let _ = self.tx.send(outcome);
    }
}
