use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One page of a listing. `next` is a continuation token; listings are
/// complete only once it comes back `None`.
#[derive(Debug, Clone)]
pub struct ListPage {
    pub keys: Vec<String>,
    pub next: Option<String>,
}

/// Path-addressed object storage boundary.
///
/// Keys are `namespace/name` strings. The backend wire protocol is not this
/// crate's concern; anything that can list, fetch and store byte blobs fits.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn list_page(&self, prefix: &str, token: Option<&str>) -> Result<ListPage, BlobError>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError>;
    async fn put(&self, key: &str, content: &[u8]) -> Result<(), BlobError>;
    async fn exists(&self, key: &str) -> Result<bool, BlobError>;
    async fn copy(&self, src: &str, dst: &str) -> Result<(), BlobError>;
    async fn delete(&self, key: &str) -> Result<(), BlobError>;
}

/// In-memory store used by tests and local runs.
///
/// The page size is deliberately configurable so callers' pagination
/// draining is exercised instead of hidden behind one large page.
pub struct MemoryBlobStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    page_size: usize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::with_page_size(1000)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            page_size: page_size.max(1),
        }
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn list_page(&self, prefix: &str, token: Option<&str>) -> Result<ListPage, BlobError> {
        let objects = self.objects.lock().expect("blob store lock poisoned");
        let mut matching = objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .filter(|key| token.map_or(true, |t| key.as_str() > t))
            .cloned();

        let keys: Vec<String> = matching.by_ref().take(self.page_size).collect();
        let next = if matching.next().is_some() {
            keys.last().cloned()
        } else {
            None
        };
        Ok(ListPage { keys, next })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        let objects = self.objects.lock().expect("blob store lock poisoned");
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, content: &[u8]) -> Result<(), BlobError> {
        let mut objects = self.objects.lock().expect("blob store lock poisoned");
        objects.insert(key.to_string(), content.to_vec());
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, BlobError> {
        let objects = self.objects.lock().expect("blob store lock poisoned");
        Ok(objects.contains_key(key))
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<(), BlobError> {
        let mut objects = self.objects.lock().expect("blob store lock poisoned");
        let content = objects
            .get(src)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(src.to_string()))?;
        objects.insert(dst.to_string(), content);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BlobError> {
        let mut objects = self.objects.lock().expect("blob store lock poisoned");
        objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| BlobError::NotFound(key.to_string()))
    }
}

/// Filesystem-backed store rooted at a configured directory, with one
/// subdirectory per namespace. Listings fit in a single page.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Maps a key onto a path under the root. Keys must consist of plain
    /// path segments; `..`, absolute paths, and empty keys are refused so
    /// no key can address an object outside the store.
    fn object_path(&self, key: &str) -> Result<PathBuf, BlobError> {
        let plain_segments = Path::new(key)
            .components()
            .all(|component| matches!(component, std::path::Component::Normal(_)));
        if key.is_empty() || !plain_segments {
            return Err(BlobError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }

    fn map_io(key: &str, err: std::io::Error) -> BlobError {
        if err.kind() == ErrorKind::NotFound {
            BlobError::NotFound(key.to_string())
        } else {
            BlobError::Io(err)
        }
    }

    async fn ensure_parent(&self, path: &Path) -> Result<(), BlobError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn list_page(&self, prefix: &str, _token: Option<&str>) -> Result<ListPage, BlobError> {
        let dir = self.root.join(prefix.trim_end_matches('/'));
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Ok(ListPage { keys: Vec::new(), next: None })
            }
            Err(err) => return Err(BlobError::Io(err)),
        };

        let namespace = prefix.trim_end_matches('/');
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                keys.push(format!("{}/{}", namespace, entry.file_name().to_string_lossy()));
            }
        }
        keys.sort();
        Ok(ListPage { keys, next: None })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        tokio::fs::read(self.object_path(key)?)
            .await
            .map_err(|err| Self::map_io(key, err))
    }

    async fn put(&self, key: &str, content: &[u8]) -> Result<(), BlobError> {
        let path = self.object_path(key)?;
        self.ensure_parent(&path).await?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, BlobError> {
        Ok(tokio::fs::try_exists(self.object_path(key)?).await?)
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<(), BlobError> {
        let src_path = self.object_path(src)?;
        let dst_path = self.object_path(dst)?;
        self.ensure_parent(&dst_path).await?;
        tokio::fs::copy(src_path, dst_path)
            .await
            .map_err(|err| Self::map_io(src, err))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BlobError> {
        tokio::fs::remove_file(self.object_path(key)?)
            .await
            .map_err(|err| Self::map_io(key, err))
    }
}
