use std::path::PathBuf;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, error};

use shared_models::error::ServiceError;

/// Where chat attachments end up. Returns the URL the file is served under.
///
/// `prefix` is chosen by the caller and scopes the stored name; `filename`
/// is whatever the client sent.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn save(&self, prefix: &str, filename: &str, bytes: &[u8]) -> Result<String, ServiceError>;
}

/// Writes attachments into a directory on local disk.
pub struct LocalAttachmentStore {
    root: PathBuf,
    url_prefix: String,
    unsafe_chars: Regex,
}

impl LocalAttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        let unsafe_chars = Regex::new(r"[^A-Za-z0-9._-]+")
            .map_err(|e| ServiceError::Internal(format!("invalid filename pattern: {}", e)))?;

        Ok(Self {
            root: root.into(),
            url_prefix: "/uploads".to_string(),
            unsafe_chars,
        })
    }

    /// Keeps only the final path component and replaces anything outside a
    /// conservative character set with `_`.
    pub fn sanitize(&self, name: &str) -> String {
        let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
        let cleaned = self.unsafe_chars.replace_all(base, "_");
        let cleaned = cleaned.trim_start_matches('.');
        if cleaned.is_empty() {
            "attachment".to_string()
        } else {
            cleaned.to_string()
        }
    }
}

#[async_trait]
impl AttachmentStore for LocalAttachmentStore {
    async fn save(&self, prefix: &str, filename: &str, bytes: &[u8]) -> Result<String, ServiceError> {
        let filename = format!(
            "{}_{}",
            self.unsafe_chars.replace_all(prefix, "_"),
            self.sanitize(filename)
        );

        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            error!("Failed to create upload directory {:?}: {}", self.root, e);
            ServiceError::Internal("failed to create upload directory".to_string())
        })?;

        let path = self.root.join(&filename);
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            error!("Failed to write attachment {:?}: {}", path, e);
            ServiceError::Internal("failed to store attachment".to_string())
        })?;

        debug!("Stored {} bytes at {:?}", bytes.len(), path);
        Ok(format!("{}/{}", self.url_prefix, filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories_and_odd_characters() {
        let store = LocalAttachmentStore::new("/tmp/unused").unwrap();

        assert_eq!(store.sanitize("../../etc/passwd"), "passwd");
        assert_eq!(store.sanitize("C:\\scans\\x ray (1).png"), "x_ray_1_.png");
        assert_eq!(store.sanitize(".hidden"), "hidden");
        assert_eq!(store.sanitize("///"), "attachment");
    }

    #[tokio::test]
    async fn save_writes_under_root_and_returns_url() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested");
        let store = LocalAttachmentStore::new(&root).unwrap();

        let url = store.save("appt_1", "lab results.pdf", b"%PDF-1.4").await.unwrap();

        assert_eq!(url, "/uploads/appt_1_lab_results.pdf");
        let written = tokio::fs::read(root.join("appt_1_lab_results.pdf")).await.unwrap();
        assert_eq!(written, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn client_directories_never_drop_the_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalAttachmentStore::new(dir.path()).unwrap();

        let first = store.save("a_100", "x/report.pdf", b"one").await.unwrap();
        let second = store.save("b_100", "..\\y\\report.pdf", b"two").await.unwrap();

        assert_eq!(first, "/uploads/a_100_report.pdf");
        assert_eq!(second, "/uploads/b_100_report.pdf");
        assert_eq!(tokio::fs::read(dir.path().join("a_100_report.pdf")).await.unwrap(), b"one");
        assert_eq!(tokio::fs::read(dir.path().join("b_100_report.pdf")).await.unwrap(), b"two");
    }
}
