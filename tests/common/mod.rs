//! Shared test harness for integration tests.
//!
//! Provides [`MemoryEngine`], an in-process playback engine that records what
//! it is fed, and helpers to build a [`Library`] over a temporary database
//! and media directory.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use localreel::capability::{CapabilityStore, ConsentProvider, FsPermissionAuthority};
use localreel::events::StatusBus;
use localreel::library::Library;
use localreel::playback::Player;
use localreel::scanner::DirectoryScanner;
use localreel_db::pool::init_pool;
use localreel_media::{
    AppendReceipt, ChunkedFeeder, Descriptor, EngineEvent, EngineEvents, Error, MediaObject,
    ObjectRegistry, ObjectUrl, PlaybackBuffer, PlaybackEngine, Result,
};

pub const MIB: usize = 1024 * 1024;

/// What a [`MemoryEngine`] saw.
#[derive(Debug, Default)]
pub struct EngineLog {
    pub attached: Vec<ObjectUrl>,
    pub blob_len: Option<usize>,
    pub appends: Vec<usize>,
    pub overlapping_appends: usize,
    pub buffers_created: usize,
    pub streams_ended: usize,
    pub detaches: usize,
}

/// Playback engine that plays into memory.
///
/// With `auto_end` the engine reports `Ended` as soon as it has the whole
/// source; otherwise the session keeps "playing" until replaced or stopped.
pub struct MemoryEngine {
    registry: ObjectRegistry,
    supported: bool,
    auto_end: bool,
    pub log: Arc<Mutex<EngineLog>>,
    events: Mutex<Option<mpsc::UnboundedSender<EngineEvent>>>,
}

impl MemoryEngine {
    pub fn new(registry: ObjectRegistry) -> Self {
        Self {
            registry,
            supported: true,
            auto_end: true,
            log: Arc::new(Mutex::new(EngineLog::default())),
            events: Mutex::new(None),
        }
    }

    /// Keep sessions playing until replaced.
    pub fn holding(mut self) -> Self {
        self.auto_end = false;
        self
    }

    /// Report every descriptor as unsupported.
    pub fn unsupported(mut self) -> Self {
        self.supported = false;
        self
    }
}

#[async_trait]
impl PlaybackEngine for MemoryEngine {
    fn is_type_supported(&self, _descriptor: &Descriptor) -> bool {
        self.supported
    }

    async fn attach(&self, url: &ObjectUrl) -> Result<EngineEvents> {
        let object = self
            .registry
            .resolve(url)
            .ok_or_else(|| Error::UnknownObject(url.to_string()))?;
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut log = self.log.lock();
            log.attached.push(url.clone());
            if let MediaObject::Blob(bytes) = &object {
                log.blob_len = Some(bytes.len());
            }
        }

        if let MediaObject::Blob(_) = object {
            let _ = tx.send(EngineEvent::LoadedMetadata);
            if self.auto_end {
                let _ = tx.send(EngineEvent::Ended);
            }
        }

        *self.events.lock() = Some(tx);
        Ok(rx)
    }

    async fn add_source_buffer(&self, _descriptor: &Descriptor) -> Result<Box<dyn PlaybackBuffer>> {
        let events = self
            .events
            .lock()
            .clone()
            .ok_or(Error::InvalidState("no stream source attached"))?;
        self.log.lock().buffers_created += 1;

        let (tx, rx) = watch::channel(false);
        Ok(Box::new(MemoryBuffer {
            log: Arc::clone(&self.log),
            events,
            auto_end: self.auto_end,
            updating_tx: Arc::new(tx),
            updating_rx: rx,
        }))
    }

    async fn detach(&self) {
        self.events.lock().take();
        self.log.lock().detaches += 1;
    }
}

/// Buffer that absorbs each window after a short delay.
pub struct MemoryBuffer {
    log: Arc<Mutex<EngineLog>>,
    events: mpsc::UnboundedSender<EngineEvent>,
    auto_end: bool,
    updating_tx: Arc<watch::Sender<bool>>,
    updating_rx: watch::Receiver<bool>,
}

#[async_trait]
impl PlaybackBuffer for MemoryBuffer {
    fn is_updating(&self) -> bool {
        *self.updating_rx.borrow()
    }

    async fn ready(&mut self) -> Result<()> {
        self.updating_rx
            .wait_for(|u| !*u)
            .await
            .map_err(|_| Error::BufferClosed)?;
        Ok(())
    }

    fn append(&mut self, window: Bytes) -> Result<AppendReceipt> {
        {
            let mut log = self.log.lock();
            if self.is_updating() {
                log.overlapping_appends += 1;
            }
            if log.appends.is_empty() {
                let _ = self.events.send(EngineEvent::LoadedMetadata);
            }
            log.appends.push(window.len());
        }

        self.updating_tx.send_replace(true);
        let (signal, receipt) = AppendReceipt::channel();
        let updating = Arc::clone(&self.updating_tx);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            updating.send_replace(false);
            signal.complete(Ok(()));
        });
        Ok(receipt)
    }

    async fn end_of_stream(&mut self) -> Result<()> {
        self.ready().await?;
        self.log.lock().streams_ended += 1;
        if self.auto_end {
            let _ = self.events.send(EngineEvent::Ended);
        }
        Ok(())
    }
}

/// Create `files` (name, size) in `dir`.
pub fn write_files(dir: &Path, files: &[(&str, usize)]) {
    for (name, size) in files {
        let data: Vec<u8> = (0..*size).map(|i| (i % 251) as u8).collect();
        std::fs::write(dir.join(name), data).expect("failed to write media file");
    }
}

/// A library over the SQLite database at `db`, playing into `engine`.
pub fn library(
    db: &Path,
    consent: Arc<dyn ConsentProvider>,
    engine: Arc<MemoryEngine>,
    registry: ObjectRegistry,
    window: u64,
) -> Library {
    let pool = init_pool(&db.to_string_lossy()).expect("failed to open database");
    let status = Arc::new(StatusBus::default());

    let player = Player::new(engine, registry, Arc::clone(&status))
        .with_feeder(ChunkedFeeder::new(window).expect("window must be non-zero"));
    let store = CapabilityStore::new(pool, Arc::new(FsPermissionAuthority), consent)
        .with_status(Arc::clone(&status));
    let scanner = DirectoryScanner::new().with_status(Arc::clone(&status));

    Library::new(store, scanner, player, status)
}

/// Status lines published so far, oldest first.
pub fn status_lines(library: &Library) -> Vec<String> {
    let mut lines: Vec<String> = library
        .status()
        .recent_events(usize::MAX)
        .iter()
        .map(|e| e.message())
        .collect();
    lines.reverse();
    lines
}
