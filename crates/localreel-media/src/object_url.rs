//! Revocable object URLs.
//!
//! A session never hands the engine a file directly. It registers a blob or a
//! stream source here, passes the URL, and revokes it when the session ends.
//! Once revoked, the URL no longer resolves.

use bytes::Bytes;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::descriptor::Descriptor;

/// What an object URL points at.
#[derive(Debug, Clone)]
pub enum MediaObject {
    /// A whole file held in memory.
    Blob(Bytes),
    /// A source fed incrementally through a `PlaybackBuffer`.
    Stream(Descriptor),
}

/// A `blob:` URL naming a registered [`MediaObject`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry of live object URLs. Cloning shares the registry.
#[derive(Debug, Clone, Default)]
pub struct ObjectRegistry {
    objects: Arc<DashMap<ObjectUrl, MediaObject>>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `object` under a fresh URL.
    pub fn create(&self, object: MediaObject) -> ObjectUrl {
        let url = ObjectUrl(format!("blob:localreel/{}", Uuid::new_v4()));
        self.objects.insert(url.clone(), object);
        tracing::trace!(url = %url, live = self.objects.len(), "Created object URL");
        url
    }

    /// Look up a live URL.
    pub fn resolve(&self, url: &ObjectUrl) -> Option<MediaObject> {
        self.objects.get(url).map(|entry| entry.value().clone())
    }

    /// Revoke `url`. Revoking twice is harmless; returns whether it was live.
    pub fn revoke(&self, url: &ObjectUrl) -> bool {
        let removed = self.objects.remove(url).is_some();
        if removed {
            tracing::trace!(url = %url, live = self.objects.len(), "Revoked object URL");
        }
        removed
    }

    /// Number of URLs currently live.
    pub fn live(&self) -> usize {
        self.objects.len()
    }
}
