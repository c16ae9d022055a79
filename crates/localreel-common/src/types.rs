//! Core type definitions for capabilities, media entries, and playback.
//!
//! All enums serialize in lowercase so persisted records and status events
//! stay readable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::ids::CapabilityId;

/// Permission state of a capability, as reported by the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    /// Access is granted and usable now.
    Granted,
    /// The environment must ask the user again before granting access.
    Prompt,
    /// Access is denied.
    Denied,
}

impl PermissionState {
    /// Whether the state allows reading right now.
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Granted => write!(f, "granted"),
            Self::Prompt => write!(f, "prompt"),
            Self::Denied => write!(f, "denied"),
        }
    }
}

/// Access mode requested for a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    #[default]
    Read,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
        }
    }
}

/// An opaque, revocable grant to read one directory.
///
/// The identity is stable across restarts; `permission` is whatever the last
/// check observed and is never trusted without re-checking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryCapability {
    pub id: CapabilityId,
    pub root: PathBuf,
    pub mode: AccessMode,
    pub permission: PermissionState,
    pub granted_at: DateTime<Utc>,
}

impl DirectoryCapability {
    /// Create a freshly granted read-only capability for `root`.
    pub fn granted(root: impl Into<PathBuf>) -> Self {
        Self {
            id: CapabilityId::new(),
            root: root.into(),
            mode: AccessMode::Read,
            permission: PermissionState::Granted,
            granted_at: Utc::now(),
        }
    }

    /// Copy of this capability with a new observed permission state.
    #[must_use]
    pub fn with_permission(mut self, permission: PermissionState) -> Self {
        self.permission = permission;
        self
    }
}

/// Kind of media file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    M4b,
    Mp3,
    Mp4,
    Webm,
    Ogg,
    Mov,
    Mkv,
}

impl MediaKind {
    /// Parse a lowercase extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "m4b" => Some(Self::M4b),
            "mp3" => Some(Self::Mp3),
            "mp4" => Some(Self::Mp4),
            "webm" => Some(Self::Webm),
            "ogg" => Some(Self::Ogg),
            "mov" => Some(Self::Mov),
            "mkv" => Some(Self::Mkv),
            _ => None,
        }
    }

    /// The canonical extension for this kind.
    pub fn extension(self) -> &'static str {
        match self {
            Self::M4b => "m4b",
            Self::Mp3 => "mp3",
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Ogg => "ogg",
            Self::Mov => "mov",
            Self::Mkv => "mkv",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// How a selected file is delivered to the playback engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Whole-file handoff.
    #[default]
    Direct,
    /// Bounded-memory window-by-window feeding.
    Chunked,
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Chunked => write!(f, "chunked"),
        }
    }
}

impl std::str::FromStr for DeliveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "chunked" => Ok(Self::Chunked),
            other => Err(format!("unknown delivery mode: {other}")),
        }
    }
}

/// Lifecycle state of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Playing,
    Ended,
    Error,
}

impl PlaybackState {
    /// Whether the session has reached a final state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ended | Self::Error)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Playing => write!(f, "playing"),
            Self::Ended => write!(f, "ended"),
            Self::Error => write!(f, "error"),
        }
    }
}
