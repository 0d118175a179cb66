//! Abstraction over resume/file storage.

use async_trait::async_trait;
use dashmap::DashMap;

/// Blob storage contract: resume uploads and their public URLs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> anyhow::Result<()>;

    /// Publicly reachable URL for a stored blob.
    fn public_url(&self, path: &str) -> String;

    async fn remove(&self, paths: &[String]) -> anyhow::Result<()>;
}

/// In-memory blob store for tests and local development.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, Vec<u8>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.blobs.contains_key(path)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> anyhow::Result<()> {
        self.blobs.insert(path.to_string(), bytes);
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("memory://{path}")
    }

    async fn remove(&self, paths: &[String]) -> anyhow::Result<()> {
        for path in paths {
            self.blobs.remove(path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_url_remove_cycle() {
        let store = MemoryBlobStore::new();
        store
            .upload("resumes/ada.pdf", b"pdf bytes".to_vec())
            .await
            .unwrap();
        assert!(store.contains("resumes/ada.pdf"));
        assert_eq!(store.public_url("resumes/ada.pdf"), "memory://resumes/ada.pdf");
        store.remove(&["resumes/ada.pdf".to_string()]).await.unwrap();
        assert!(!store.contains("resumes/ada.pdf"));
    }
}
