//! The user consent gesture: choosing a directory.

use async_trait::async_trait;
use localreel_common::{AccessMode, Result};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// What the chooser is asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentRequest {
    /// Location the chooser opens in.
    pub start_in: PathBuf,
    /// Stable id so the chooser can remember its last location.
    pub id: &'static str,
    pub mode: AccessMode,
}

impl Default for ConsentRequest {
    fn default() -> Self {
        Self {
            start_in: PathBuf::from(shellexpand::tilde("~/Videos").as_ref()),
            id: "videos-directory",
            mode: AccessMode::Read,
        }
    }
}

/// A directory chooser.
///
/// `Ok(None)` means the user cancelled.
#[async_trait]
pub trait ConsentProvider: Send + Sync {
    async fn choose_directory(&self, request: &ConsentRequest) -> Result<Option<PathBuf>>;
}

/// Consent already given as a path, e.g. on the command line.
///
/// Anything that is not an existing directory counts as a cancellation.
#[derive(Debug, Clone)]
pub struct PathConsent {
    path: Option<PathBuf>,
}

impl PathConsent {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A chooser the user always cancels.
    pub fn cancelled() -> Self {
        Self { path: None }
    }
}

#[async_trait]
impl ConsentProvider for PathConsent {
    async fn choose_directory(&self, _request: &ConsentRequest) -> Result<Option<PathBuf>> {
        let Some(path) = &self.path else {
            return Ok(None);
        };

        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => Ok(Some(path.clone())),
            Ok(_) => {
                tracing::warn!("Not a directory: {:?}", path);
                Ok(None)
            }
            Err(e) => {
                tracing::warn!("Cannot use {:?}: {}", path, e);
                Ok(None)
            }
        }
    }
}

/// Interactive chooser reading a path from stdin.
///
/// An empty line picks the suggested location; end of input cancels.
#[derive(Debug, Default, Clone)]
pub struct StdinConsent;

#[async_trait]
impl ConsentProvider for StdinConsent {
    async fn choose_directory(&self, request: &ConsentRequest) -> Result<Option<PathBuf>> {
        let mut stderr = tokio::io::stderr();
        let prompt = format!(
            "Media directory to open read-only [{}]: ",
            request.start_in.display()
        );
        stderr.write_all(prompt.as_bytes()).await?;
        stderr.flush().await?;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let Some(line) = lines.next_line().await? else {
            return Ok(None);
        };

        let line = line.trim();
        let path = if line.is_empty() {
            request.start_in.clone()
        } else {
            PathBuf::from(shellexpand::tilde(line).as_ref())
        };

        PathConsent::new(path).choose_directory(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_request_is_read_only() {
        let request = ConsentRequest::default();
        assert_eq!(request.mode, AccessMode::Read);
        assert_eq!(request.id, "videos-directory");
        assert!(request.start_in.ends_with("Videos"));
    }

    #[tokio::test]
    async fn test_path_consent() {
        let dir = tempfile::tempdir().unwrap();
        let request = ConsentRequest::default();

        let chosen = PathConsent::new(dir.path())
            .choose_directory(&request)
            .await
            .unwrap();
        assert_eq!(chosen.as_deref(), Some(dir.path()));

        let file = dir.path().join("a.mp4");
        std::fs::write(&file, b"x").unwrap();
        assert!(PathConsent::new(&file)
            .choose_directory(&request)
            .await
            .unwrap()
            .is_none());

        assert!(PathConsent::new(dir.path().join("missing"))
            .choose_directory(&request)
            .await
            .unwrap()
            .is_none());

        assert!(PathConsent::cancelled()
            .choose_directory(&request)
            .await
            .unwrap()
            .is_none());
    }
}
