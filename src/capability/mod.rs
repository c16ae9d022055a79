//! Directory capability store.
//!
//! Persists the directory the user chose and reconfirms on every load that
//! it still grants read access. A capability handed out by this module is
//! always granted at the time it is returned.

mod consent;
mod permission;

pub use consent::{ConsentProvider, ConsentRequest, PathConsent, StdinConsent};
pub use permission::{FsPermissionAuthority, PermissionAuthority};

use localreel_common::{DirectoryCapability, Error, PermissionState, Result};
use localreel_db::pool::{get_conn, DbPool};
use localreel_db::queries::capabilities::{self, DIRECTORY_HANDLE_KEY};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::events::{StatusBus, StatusPayload};

/// Saves, restores and requests the directory capability.
pub struct CapabilityStore {
    pool: DbPool,
    authority: Arc<dyn PermissionAuthority>,
    consent: Arc<dyn ConsentProvider>,
    status: Option<Arc<StatusBus>>,
}

impl CapabilityStore {
    pub fn new(
        pool: DbPool,
        authority: Arc<dyn PermissionAuthority>,
        consent: Arc<dyn ConsentProvider>,
    ) -> Self {
        Self {
            pool,
            authority,
            consent,
            status: None,
        }
    }

    /// Publish access changes to `status`.
    pub fn with_status(mut self, status: Arc<StatusBus>) -> Self {
        self.status = Some(status);
        self
    }

    /// Durably store `capability`, replacing any previous one.
    ///
    /// A failed write leaves the previous capability in place.
    pub fn save(&self, capability: &DirectoryCapability) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        let marker = capabilities::save_capability(&conn, DIRECTORY_HANDLE_KEY, capability)?;
        debug!(
            "Saved directory capability {} for {:?} at {}",
            capability.id, capability.root, marker.timestamp
        );
        Ok(())
    }

    /// Restore the saved capability, if it still grants access.
    ///
    /// A capability that needs a prompt is re-requested once. One that is
    /// denied, or whose stored handle cannot be read, is discarded.
    pub async fn load(&self) -> Result<Option<DirectoryCapability>> {
        let Some(stored) = self.read_stored()? else {
            return Ok(None);
        };

        match self.authority.query(&stored).await {
            PermissionState::Granted => {
                self.publish(StatusPayload::UsingSavedDirectory);
                return Ok(Some(stored.with_permission(PermissionState::Granted)));
            }
            PermissionState::Prompt => {
                debug!("Re-requesting access to {:?}", stored.root);
                match self.authority.request(&stored).await {
                    PermissionState::Granted => {
                        self.publish(StatusPayload::PermissionRegranted);
                        return Ok(Some(stored.with_permission(PermissionState::Granted)));
                    }
                    state => info!("Access to {:?} not re-granted ({:?})", stored.root, state),
                }
            }
            PermissionState::Denied => info!("Access to {:?} denied", stored.root),
        }

        self.forget()?;
        Ok(None)
    }

    /// Ask the user to choose a directory and store the result.
    ///
    /// Cancellation fails with [`Error::RequestDenied`] and leaves any stored
    /// capability untouched.
    pub async fn request(&self) -> Result<DirectoryCapability> {
        let request = ConsentRequest::default();
        let chosen = match self.consent.choose_directory(&request).await {
            Ok(Some(path)) => path,
            Ok(None) => {
                self.publish(StatusPayload::DirectoryDenied);
                return Err(Error::RequestDenied);
            }
            Err(e) => {
                warn!("Directory chooser failed: {}", e);
                self.publish(StatusPayload::DirectoryDenied);
                return Err(Error::RequestDenied);
            }
        };

        let mut capability = DirectoryCapability::granted(chosen);
        capability.mode = request.mode;

        // The capability is usable for this run even if it cannot be kept.
        if let Err(e) = self.save(&capability) {
            warn!("Failed to persist directory capability: {}", e);
            self.publish(StatusPayload::Failed {
                message: format!("Could not remember directory: {}", e),
            });
        }

        self.publish(StatusPayload::DirectoryGranted);
        Ok(capability)
    }

    /// Drop the stored capability. Returns whether one existed.
    pub fn forget(&self) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        let removed = capabilities::delete_capability(&conn, DIRECTORY_HANDLE_KEY)?;
        if removed {
            info!("Discarded stored directory capability");
        }
        Ok(removed)
    }

    fn read_stored(&self) -> Result<Option<DirectoryCapability>> {
        let handle = {
            let conn = get_conn(&self.pool)?;
            if capabilities::get_marker(&conn, DIRECTORY_HANDLE_KEY)?.is_none() {
                return Ok(None);
            }
            capabilities::get_handle(&conn, DIRECTORY_HANDLE_KEY)
        };

        match handle {
            Ok(Some(capability)) => Ok(Some(capability)),
            Ok(None) => {
                warn!("Capability marker present without a handle");
                self.forget()?;
                Ok(None)
            }
            Err(e) if e.is_storage_unavailable() => Err(e),
            Err(e) => {
                warn!("Discarding unreadable capability handle: {}", e);
                self.forget()?;
                Ok(None)
            }
        }
    }

    fn publish(&self, payload: StatusPayload) {
        if let Some(status) = &self.status {
            status.publish(payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use localreel_db::pool::init_memory_pool;
    use parking_lot::Mutex;

    /// Authority answering from fixed states and counting re-requests.
    struct Scripted {
        query: PermissionState,
        request: PermissionState,
        requests: Mutex<usize>,
    }

    impl Scripted {
        fn new(query: PermissionState, request: PermissionState) -> Arc<Self> {
            Arc::new(Self {
                query,
                request,
                requests: Mutex::new(0),
            })
        }
    }

    #[async_trait]
    impl PermissionAuthority for Scripted {
        async fn query(&self, _capability: &DirectoryCapability) -> PermissionState {
            self.query
        }

        async fn request(&self, _capability: &DirectoryCapability) -> PermissionState {
            *self.requests.lock() += 1;
            self.request
        }
    }

    fn store(authority: Arc<Scripted>) -> CapabilityStore {
        CapabilityStore::new(
            init_memory_pool().unwrap(),
            authority,
            Arc::new(PathConsent::cancelled()),
        )
    }

    #[tokio::test]
    async fn test_load_without_save_is_none() {
        let store = store(Scripted::new(
            PermissionState::Granted,
            PermissionState::Granted,
        ));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_granted() {
        let store = store(Scripted::new(
            PermissionState::Granted,
            PermissionState::Denied,
        ));
        let cap = DirectoryCapability::granted("/videos");
        store.save(&cap).unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.id, cap.id);
        assert!(loaded.permission.is_granted());
    }

    #[tokio::test]
    async fn test_prompt_requests_exactly_once() {
        let authority = Scripted::new(PermissionState::Prompt, PermissionState::Granted);
        let store = store(Arc::clone(&authority));
        store
            .save(&DirectoryCapability::granted("/videos").with_permission(PermissionState::Prompt))
            .unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.permission, PermissionState::Granted);
        assert_eq!(*authority.requests.lock(), 1);
    }

    #[tokio::test]
    async fn test_prompt_then_denied_discards() {
        let authority = Scripted::new(PermissionState::Prompt, PermissionState::Denied);
        let store = store(Arc::clone(&authority));
        store.save(&DirectoryCapability::granted("/videos")).unwrap();

        assert!(store.load().await.unwrap().is_none());
        assert_eq!(*authority.requests.lock(), 1);
        // Discarded, so the next load finds nothing at all.
        assert!(!store.forget().unwrap());
    }

    #[tokio::test]
    async fn test_denied_discards_without_request() {
        let authority = Scripted::new(PermissionState::Denied, PermissionState::Granted);
        let store = store(Arc::clone(&authority));
        store.save(&DirectoryCapability::granted("/videos")).unwrap();

        assert!(store.load().await.unwrap().is_none());
        assert_eq!(*authority.requests.lock(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_request_keeps_previous() {
        let store = store(Scripted::new(
            PermissionState::Granted,
            PermissionState::Granted,
        ));
        let cap = DirectoryCapability::granted("/videos");
        store.save(&cap).unwrap();

        let err = store.request().await.unwrap_err();
        assert!(matches!(err, Error::RequestDenied));

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.root, cap.root);
    }

    #[tokio::test]
    async fn test_request_reports_failed_save() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_memory_pool().unwrap();
        get_conn(&pool)
            .unwrap()
            .execute_batch("DROP TABLE capability_handles;")
            .unwrap();

        let status = Arc::new(StatusBus::default());
        let store = CapabilityStore::new(
            pool,
            Arc::new(FsPermissionAuthority),
            Arc::new(PathConsent::new(dir.path())),
        )
        .with_status(Arc::clone(&status));

        // Still usable for this run.
        let cap = store.request().await.unwrap();
        assert_eq!(cap.root, dir.path());

        let messages: Vec<String> = status
            .recent_events(2)
            .iter()
            .rev()
            .map(|e| e.message())
            .collect();
        assert!(messages[0].starts_with("Error: Could not remember directory"));
        assert_eq!(messages[1], "Directory access granted");
    }

    #[tokio::test]
    async fn test_request_saves_choice() {
        let dir = tempfile::tempdir().unwrap();
        let status = Arc::new(StatusBus::default());
        let store = CapabilityStore::new(
            init_memory_pool().unwrap(),
            Arc::new(FsPermissionAuthority),
            Arc::new(PathConsent::new(dir.path())),
        )
        .with_status(Arc::clone(&status));

        let cap = store.request().await.unwrap();
        assert_eq!(cap.root, dir.path());
        assert_eq!(
            status.latest_message().as_deref(),
            Some("Directory access granted")
        );

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.id, cap.id);
        assert_eq!(
            status.latest_message().as_deref(),
            Some("Using saved directory access")
        );
    }
}
