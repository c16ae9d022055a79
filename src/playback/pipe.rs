//! A playback engine that pipes media into an external player.
//!
//! The player is started once per attached source and reads the media from
//! its stdin (`mpv -`, `ffplay -`, ...). A blob is written in one go; a
//! stream source hands stdin to a [`WriterBuffer`] so the feeder controls
//! the pace.

use async_trait::async_trait;
use localreel_media::{
    Descriptor, EngineEvent, EngineEvents, Error, MediaObject, ObjectRegistry, ObjectUrl,
    PlaybackBuffer, PlaybackEngine, Result, WriterBuffer,
};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::PlayerConfig;

/// The process currently playing the attached source.
struct Attached {
    cancel: CancellationToken,
    stdin: Option<ChildStdin>,
}

pub struct PipeEngine {
    command: String,
    args: Vec<String>,
    supported_types: Vec<String>,
    registry: ObjectRegistry,
    attached: Mutex<Option<Attached>>,
}

impl PipeEngine {
    /// Create an engine resolving object URLs through `registry`.
    pub fn new(config: &PlayerConfig, registry: ObjectRegistry) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            supported_types: config.supported_types.clone(),
            registry,
            attached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl PlaybackEngine for PipeEngine {
    fn is_type_supported(&self, descriptor: &Descriptor) -> bool {
        self.supported_types.is_empty()
            || self
                .supported_types
                .iter()
                .any(|t| t == descriptor.mime_type() || t == descriptor.as_str())
    }

    async fn attach(&self, url: &ObjectUrl) -> Result<EngineEvents> {
        let object = self
            .registry
            .resolve(url)
            .ok_or_else(|| Error::UnknownObject(url.to_string()))?;

        self.detach().await;

        debug!("Starting player: {} {:?}", self.command, self.args);
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::engine(format!("failed to start {}: {}", self.command, e)))?;

        let mut stdin = child.stdin.take();
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();

        if let MediaObject::Blob(bytes) = object {
            if let Some(mut pipe) = stdin.take() {
                tokio::spawn(async move {
                    if let Err(e) = pipe.write_all(&bytes).await {
                        debug!("Player stopped reading: {}", e);
                    }
                    // Dropping stdin tells the player the file is complete.
                });
            }
        }

        // The player is up and has the source; that is as much metadata as
        // a pipe can report.
        let _ = tx.send(EngineEvent::LoadedMetadata);

        let token = cancel.clone();
        let command = self.command.clone();
        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    let event = match status {
                        Ok(status) if status.success() => EngineEvent::Ended,
                        Ok(status) => EngineEvent::Error(format!("{} exited with {}", command, status)),
                        Err(e) => EngineEvent::Error(e.to_string()),
                    };
                    let _ = tx.send(event);
                }
                _ = token.cancelled() => {
                    if let Err(e) = child.kill().await {
                        warn!("Failed to stop {}: {}", command, e);
                    }
                }
            }
        });

        *self.attached.lock().await = Some(Attached { cancel, stdin });
        Ok(rx)
    }

    async fn add_source_buffer(&self, descriptor: &Descriptor) -> Result<Box<dyn PlaybackBuffer>> {
        let mut attached = self.attached.lock().await;
        let stdin = attached
            .as_mut()
            .and_then(|a| a.stdin.take())
            .ok_or(Error::InvalidState("no stream source attached"))?;

        debug!("Opened playback buffer for {}", descriptor);
        Ok(Box::new(WriterBuffer::new(stdin)))
    }

    async fn detach(&self) {
        if let Some(attached) = self.attached.lock().await.take() {
            attached.cancel.cancel();
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use bytes::Bytes;
    use localreel_media::descriptor_for_name;

    fn engine(command: &str, args: &[&str], registry: ObjectRegistry) -> PipeEngine {
        let config = PlayerConfig {
            command: command.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            supported_types: Vec::new(),
        };
        PipeEngine::new(&config, registry)
    }

    #[test]
    fn test_supported_types() {
        let registry = ObjectRegistry::new();
        let mut config = PlayerConfig::default();
        config.supported_types = vec!["video/webm".to_string()];
        let engine = PipeEngine::new(&config, registry);

        assert!(engine.is_type_supported(&descriptor_for_name("a.mkv")));
        assert!(!engine.is_type_supported(&descriptor_for_name("a.mp4")));
    }

    #[tokio::test]
    async fn test_blob_plays_to_end() {
        let registry = ObjectRegistry::new();
        let engine = engine("cat", &[], registry.clone());
        let url = registry.create(MediaObject::Blob(Bytes::from_static(b"frames")));

        let mut events = engine.attach(&url).await.unwrap();
        assert_eq!(events.recv().await, Some(EngineEvent::LoadedMetadata));
        assert_eq!(events.recv().await, Some(EngineEvent::Ended));
    }

    #[tokio::test]
    async fn test_stream_buffer_and_exit_status() {
        let registry = ObjectRegistry::new();
        let engine = engine("sh", &["-c", "cat >/dev/null; exit 3"], registry.clone());
        let descriptor = descriptor_for_name("a.webm");
        let url = registry.create(MediaObject::Stream(descriptor));

        let mut events = engine.attach(&url).await.unwrap();
        let mut buffer = engine.add_source_buffer(&descriptor).await.unwrap();
        buffer
            .append(Bytes::from_static(b"window"))
            .unwrap()
            .absorbed()
            .await
            .unwrap();
        buffer.end_of_stream().await.unwrap();
        drop(buffer);

        assert_eq!(events.recv().await, Some(EngineEvent::LoadedMetadata));
        assert!(matches!(events.recv().await, Some(EngineEvent::Error(_))));

        // Only one buffer per stream source.
        assert!(engine.add_source_buffer(&descriptor).await.is_err());
        engine.detach().await;
    }

    #[tokio::test]
    async fn test_unknown_url() {
        let registry = ObjectRegistry::new();
        let engine = engine("cat", &[], registry.clone());
        let url = registry.create(MediaObject::Blob(Bytes::new()));
        registry.revoke(&url);

        assert!(matches!(
            engine.attach(&url).await,
            Err(Error::UnknownObject(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_player() {
        let registry = ObjectRegistry::new();
        let engine = engine("/nonexistent/player", &[], registry.clone());
        let url = registry.create(MediaObject::Blob(Bytes::new()));

        assert!(matches!(engine.attach(&url).await, Err(Error::Engine(_))));
    }
}
