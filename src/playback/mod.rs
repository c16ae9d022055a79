//! Playback sessions.
//!
//! [`Player`] owns the single active session. Starting a session first tears
//! down the previous one: its task is aborted, the engine detached and its
//! object URL revoked. Every exit path of a session (end, error, replacement,
//! stop) revokes the URL it created.
//!
//! # Delivery modes
//!
//! - **Direct**: the whole file is read into memory and handed over as a blob.
//! - **Chunked**: the engine gets a stream source that the
//!   [`ChunkedFeeder`] fills one window at a time.
//!
//! Which mode to use is up to the caller.

mod chunked;
mod direct;
mod pipe;

pub use pipe::PipeEngine;

use localreel_common::{DeliveryMode, Error, PlaybackState, Result, SessionId};
use localreel_media::{ChunkedFeeder, EngineEvent, EngineEvents, ObjectRegistry, ObjectUrl, PlaybackEngine};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::events::{StatusBus, StatusPayload};
use crate::scanner::MediaEntry;

/// The active play-out of one entry.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub id: SessionId,
    pub entry: Arc<MediaEntry>,
    pub mode: DeliveryMode,
    /// The object URL the engine is playing from.
    pub sink: ObjectUrl,
}

struct ActiveSession {
    session: PlaybackSession,
    task: JoinHandle<()>,
}

/// Owns at most one playback session at a time.
pub struct Player {
    engine: Arc<dyn PlaybackEngine>,
    registry: ObjectRegistry,
    status: Arc<StatusBus>,
    feeder: ChunkedFeeder,
    state: Arc<watch::Sender<PlaybackState>>,
    current: Mutex<Option<ActiveSession>>,
}

impl Player {
    /// Create a player. `registry` must be the one `engine` resolves URLs in.
    pub fn new(
        engine: Arc<dyn PlaybackEngine>,
        registry: ObjectRegistry,
        status: Arc<StatusBus>,
    ) -> Self {
        let (state, _) = watch::channel(PlaybackState::Idle);
        Self {
            engine,
            registry,
            status,
            feeder: ChunkedFeeder::default(),
            state: Arc::new(state),
            current: Mutex::new(None),
        }
    }

    /// Use `feeder` for chunked sessions.
    pub fn with_feeder(mut self, feeder: ChunkedFeeder) -> Self {
        self.feeder = feeder;
        self
    }

    /// Start playing `entry`, replacing any active session.
    ///
    /// Returns once the engine has the source. Playback itself continues in
    /// the background; see [`wait`](Self::wait).
    pub async fn play(&self, entry: Arc<MediaEntry>, mode: DeliveryMode) -> Result<SessionId> {
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            self.teardown(previous).await;
        }

        let id = SessionId::new();
        info!(session = %id, "Starting {:?} playback of {}", mode, entry.name);
        self.state.send_replace(PlaybackState::Loading);
        self.status.publish(StatusPayload::Loading {
            name: entry.name.clone(),
            chunked: mode == DeliveryMode::Chunked,
        });

        let (sink, task) = match mode {
            DeliveryMode::Direct => direct::start(self, &entry).await?,
            DeliveryMode::Chunked => chunked::start(self, &entry).await?,
        };

        *current = Some(ActiveSession {
            session: PlaybackSession {
                id,
                entry,
                mode,
                sink,
            },
            task,
        });
        Ok(id)
    }

    /// Tear down the active session, if any.
    pub async fn stop(&self) {
        if let Some(previous) = self.current.lock().await.take() {
            self.teardown(previous).await;
        }
    }

    /// Wait until the current session ends or fails.
    ///
    /// Returns immediately with `Idle` when nothing is playing.
    pub async fn wait(&self) -> PlaybackState {
        let mut rx = self.state.subscribe();
        let result = rx
            .wait_for(|s| s.is_terminal() || *s == PlaybackState::Idle)
            .await
            .map(|s| *s);
        result.unwrap_or(PlaybackState::Idle)
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.subscribe()
    }

    /// The active session, if any.
    ///
    /// A session that has ended or failed is dropped here; its task has
    /// finished and its URL is already revoked.
    pub async fn session(&self) -> Option<PlaybackSession> {
        let mut current = self.current.lock().await;
        if self.state().is_terminal() {
            if let Some(finished) = current.take() {
                debug!(session = %finished.session.id, "Dropping finished session");
            }
            return None;
        }
        current.as_ref().map(|active| active.session.clone())
    }

    async fn teardown(&self, previous: ActiveSession) {
        debug!(session = %previous.session.id, "Tearing down session");
        previous.task.abort();
        let _ = previous.task.await;
        self.engine.detach().await;
        self.registry.revoke(&previous.session.sink);
        self.state.send_replace(PlaybackState::Idle);
    }

    /// Release what a failed start acquired and report `err`.
    async fn abort_start(&self, url: Option<&ObjectUrl>, err: Error) -> Error {
        error!("Playback failed to start: {}", err);
        if let Some(url) = url {
            self.engine.detach().await;
            self.registry.revoke(url);
        }
        self.status.publish(failure_status(&err));
        self.state.send_replace(PlaybackState::Error);
        err
    }

    fn context(&self, entry: &Arc<MediaEntry>, url: &ObjectUrl) -> SessionContext {
        SessionContext {
            entry: Arc::clone(entry),
            url: url.clone(),
            registry: self.registry.clone(),
            status: Arc::clone(&self.status),
            state: Arc::clone(&self.state),
        }
    }
}

/// What a session's background task needs to report and clean up.
struct SessionContext {
    entry: Arc<MediaEntry>,
    url: ObjectUrl,
    registry: ObjectRegistry,
    status: Arc<StatusBus>,
    state: Arc<watch::Sender<PlaybackState>>,
}

impl SessionContext {
    fn set_state(&self, state: PlaybackState) {
        self.state.send_replace(state);
    }

    fn playing(&self) {
        self.set_state(PlaybackState::Playing);
        self.status.publish(StatusPayload::Playing {
            name: self.entry.name.clone(),
        });
    }

    // Terminal states are set last so a waiter sees everything else done.
    fn ended(&self) {
        self.registry.revoke(&self.url);
        self.status.publish(StatusPayload::Ended);
        self.set_state(PlaybackState::Ended);
    }

    fn fail(&self, payload: StatusPayload) {
        error!("Playback of {} failed: {}", self.entry.name, payload.message());
        self.registry.revoke(&self.url);
        self.status.publish(payload);
        self.set_state(PlaybackState::Error);
    }
}

/// Follow engine events until the session ends or fails.
async fn follow_events(ctx: SessionContext, mut events: EngineEvents) {
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::LoadedMetadata => ctx.playing(),
            EngineEvent::Ended => return ctx.ended(),
            EngineEvent::Error(message) => return ctx.fail(StatusPayload::Failed { message }),
        }
    }
    ctx.fail(engine_closed());
}

fn engine_closed() -> StatusPayload {
    StatusPayload::Failed {
        message: "Playback engine closed".to_string(),
    }
}

fn failure_status(err: &Error) -> StatusPayload {
    match err {
        Error::UnsupportedFormat(_) => StatusPayload::Unsupported,
        other => StatusPayload::Failed {
            message: other.to_string(),
        },
    }
}
