//! Status reporting.
//!
//! [`StatusBus`] wraps a `tokio::sync::broadcast` channel with a bounded
//! ring buffer of recent events, so a status line rendered late can still
//! show what happened last.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Maximum number of events retained in the ring buffer.
const MAX_RECENT_EVENTS: usize = 100;

// ---------------------------------------------------------------------------
// StatusPayload
// ---------------------------------------------------------------------------

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusPayload {
    // -- Directory access ----------------------------------------------------
    UsingSavedDirectory,
    PermissionRegranted,
    DirectoryGranted,
    DirectoryDenied,

    // -- Listing -------------------------------------------------------------
    ScanComplete {
        count: usize,
    },

    // -- Playback ------------------------------------------------------------
    Loading {
        name: String,
        chunked: bool,
    },
    Progress {
        percent: u8,
    },
    Playing {
        name: String,
    },
    Ended,
    Unsupported,
    Failed {
        message: String,
    },
}

impl StatusPayload {
    /// The human-readable status line.
    pub fn message(&self) -> String {
        match self {
            Self::UsingSavedDirectory => "Using saved directory access".to_string(),
            Self::PermissionRegranted => "Permission re-granted".to_string(),
            Self::DirectoryGranted => "Directory access granted".to_string(),
            Self::DirectoryDenied => "Failed to get directory access".to_string(),
            Self::ScanComplete { count } => format!("Found {} video files", count),
            Self::Loading {
                name,
                chunked: false,
            } => format!("Loading: {}", name),
            Self::Loading {
                name,
                chunked: true,
            } => format!("Loading large video: {}", name),
            Self::Progress { percent } => format!("Loading: {}%", percent),
            Self::Playing { name } => format!("Playing: {}", name),
            Self::Ended => "Playback ended".to_string(),
            Self::Unsupported => "Unsupported video format".to_string(),
            Self::Failed { message } => format!("Error: {}", message),
        }
    }

    fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::DirectoryDenied | Self::Unsupported | Self::Failed { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// StatusEvent
// ---------------------------------------------------------------------------

/// A timestamped status event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub payload: StatusPayload,
}

impl StatusEvent {
    pub fn new(payload: StatusPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn message(&self) -> String {
        self.payload.message()
    }
}

// ---------------------------------------------------------------------------
// StatusBus
// ---------------------------------------------------------------------------

/// Broadcast channel with a bounded ring buffer of recent status events.
pub struct StatusBus {
    tx: broadcast::Sender<StatusEvent>,
    recent: RwLock<VecDeque<StatusEvent>>,
}

impl StatusBus {
    /// Create a new status bus.
    ///
    /// `capacity` controls the broadcast channel buffer size (not the ring
    /// buffer, which is always [`MAX_RECENT_EVENTS`]).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            recent: RwLock::new(VecDeque::with_capacity(MAX_RECENT_EVENTS)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.tx.subscribe()
    }

    /// Log `payload`, store it in the ring buffer and send it to subscribers.
    pub fn publish(&self, payload: StatusPayload) {
        let event = StatusEvent::new(payload);

        if event.payload.is_failure() {
            tracing::warn!(status = %event.message());
        } else if matches!(event.payload, StatusPayload::Progress { .. }) {
            tracing::trace!(status = %event.message());
        } else {
            tracing::debug!(status = %event.message());
        }

        {
            let mut recent = self.recent.write();
            if recent.len() >= MAX_RECENT_EVENTS {
                recent.pop_back();
            }
            recent.push_front(event.clone());
        }

        // No subscribers is fine.
        let _ = self.tx.send(event);
    }

    /// Return the `n` most recent events (newest first).
    pub fn recent_events(&self, n: usize) -> Vec<StatusEvent> {
        let recent = self.recent.read();
        recent.iter().take(n).cloned().collect()
    }

    /// The current status line, if anything has been published.
    pub fn latest_message(&self) -> Option<String> {
        self.recent.read().front().map(StatusEvent::message)
    }
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new(256)
    }
}
