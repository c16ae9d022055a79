//! Permission checks for a saved directory capability.

use async_trait::async_trait;
use localreel_common::{DirectoryCapability, PermissionState};
use std::io::ErrorKind;

/// Answers whether a capability still grants access.
#[async_trait]
pub trait PermissionAuthority: Send + Sync {
    /// Current permission, without asking the user.
    async fn query(&self, capability: &DirectoryCapability) -> PermissionState;

    /// Ask for permission again. Called at most once per load.
    async fn request(&self, capability: &DirectoryCapability) -> PermissionState;
}

/// Judges permission by trying to list the directory.
///
/// A readable directory is granted. A permission error may clear up if the
/// user fixes it, so it maps to `Prompt`. Anything else (gone, not a
/// directory) is denied.
#[derive(Debug, Default, Clone)]
pub struct FsPermissionAuthority;

impl FsPermissionAuthority {
    async fn check(capability: &DirectoryCapability) -> PermissionState {
        match tokio::fs::read_dir(&capability.root).await {
            Ok(_) => PermissionState::Granted,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => PermissionState::Prompt,
            Err(e) => {
                tracing::debug!("Directory {:?} unavailable: {}", capability.root, e);
                PermissionState::Denied
            }
        }
    }
}

#[async_trait]
impl PermissionAuthority for FsPermissionAuthority {
    async fn query(&self, capability: &DirectoryCapability) -> PermissionState {
        Self::check(capability).await
    }

    async fn request(&self, capability: &DirectoryCapability) -> PermissionState {
        Self::check(capability).await
    }
}
