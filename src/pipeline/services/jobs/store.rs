use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::StoreError;
use crate::pipeline::services::learning::layout::is_image_file;

/// Source of raw image bytes, addressed by storage key.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StoreError>;
}

/// Images stored as files below a root directory, keys being relative paths.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keys of every image file below the root, `/`-separated and sorted.
    /// A missing root holds no keys.
    pub async fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        let io_error = |source| StoreError::Io {
            key: self.root.display().to_string(),
            source,
        };

        let mut keys = Vec::new();
        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound && dir == self.root => return Ok(keys),
                Err(source) => return Err(io_error(source)),
            };
            while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(io_error)?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() && is_image_file(&path) {
                    if let Ok(relative) = path.strip_prefix(&self.root) {
                        let parts: Vec<_> = relative.components().map(|c| c.as_os_str().to_string_lossy()).collect();
                        keys.push(parts.join("/"));
                    }
                }
            }
        }

        keys.sort();
        debug!(root = %self.root.display(), count = keys.len(), "Listed image keys");
        Ok(keys)
    }

    /// `None` for keys that would leave the root.
    fn resolve(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key);
        let mut components = relative.components().peekable();
        components.peek()?;
        if components.all(|c| matches!(c, Component::Normal(_) | Component::CurDir)) {
            Some(self.root.join(relative))
        } else {
            None
        }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self
            .resolve(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!(key, bytes = bytes.len(), "Fetched image");
                Ok(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound(key.to_string())),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}
