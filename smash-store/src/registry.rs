use std::sync::Arc;

use tracing::{info, warn};

use crate::blob::{BlobError, BlobStore};
use crate::sealed::{self, SealError, StorageKey};

/// Namespace of pending reservation entries, keyed by fingerprint.
pub const REGISTRY: &str = "registry";
/// Namespace of entries promoted by the sweep and awaiting dispatch.
pub const QUEUED: &str = "queued";
/// Write-once session-cookie cache, keyed by username.
pub const COOKIES: &str = "cookies";
/// Transient captcha snapshots written by the login collaborator.
pub const CAPTCHA: &str = "captcha";

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry object not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Sealed(#[from] SealError),

    #[error("storage error: {0}")]
    Storage(BlobError),

    #[error("cookie entry for {0} is not valid UTF-8")]
    CorruptCookie(String),
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound(_))
    }
}

/// Confidential storage of JSON records under `namespace/name` paths.
///
/// Every payload is sealed before upload and opened after download; the
/// blob store only ever sees `nonce ‖ ciphertext`.
pub struct Registry {
    store: Arc<dyn BlobStore>,
    key: StorageKey,
}

impl Registry {
    pub fn new(store: Arc<dyn BlobStore>, key: StorageKey) -> Self {
        Self { store, key }
    }

    fn object_key(namespace: &str, name: &str) -> String {
        format!("{}/{}", namespace, name)
    }

    /// All object names under `namespace`, with the prefix stripped.
    ///
    /// Pages are drained until the backend returns no continuation token,
    /// so no entry is silently dropped on large namespaces.
    pub async fn list(&self, namespace: &str) -> Result<Vec<String>, RegistryError> {
        let prefix = format!("{}/", namespace);
        let mut names = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = self
                .store
                .list_page(&prefix, token.as_deref())
                .await
                .map_err(RegistryError::Storage)?;
            for key in page.keys {
                let name = key.trim_start_matches(&prefix);
                // The prefix placeholder object lists as an empty name.
                if !name.is_empty() {
                    names.push(name.to_string());
                }
            }
            match page.next {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        Ok(names)
    }

    /// Seals and uploads, unconditionally overwriting an existing object.
    /// Callers needing create-if-absent must check [`Registry::exists`] first.
    pub async fn put(
        &self,
        namespace: &str,
        name: &str,
        plaintext: &[u8],
    ) -> Result<(), RegistryError> {
        let sealed = sealed::seal(&self.key, plaintext)?;
        self.store
            .put(&Self::object_key(namespace, name), &sealed)
            .await
            .map_err(RegistryError::Storage)?;
        info!(namespace, name, "uploaded sealed object");
        Ok(())
    }

    /// Downloads and opens. A missing object is reported as
    /// [`RegistryError::NotFound`] so callers can branch on it.
    pub async fn get(&self, namespace: &str, name: &str) -> Result<Vec<u8>, RegistryError> {
        let key = Self::object_key(namespace, name);
        match self.store.get(&key).await {
            Ok(content) => Ok(sealed::open(&self.key, &content)?),
            Err(BlobError::NotFound(key)) => Err(RegistryError::NotFound(key)),
            Err(err) => Err(RegistryError::Storage(err)),
        }
    }

    pub async fn exists(&self, namespace: &str, name: &str) -> Result<bool, RegistryError> {
        self.store
            .exists(&Self::object_key(namespace, name))
            .await
            .map_err(RegistryError::Storage)
    }

    /// Copy-then-delete promotion between namespaces; not atomic.
    ///
    /// Delete is attempted only after the copy succeeds. A failed delete
    /// leaves the object present in both places, which is harmless: a
    /// re-run sees the source again and the copy simply overwrites.
    pub async fn move_object(
        &self,
        src_namespace: &str,
        name: &str,
        dst_namespace: &str,
    ) -> Result<(), RegistryError> {
        let src = Self::object_key(src_namespace, name);
        let dst = Self::object_key(dst_namespace, name);

        match self.store.copy(&src, &dst).await {
            Ok(()) => {}
            Err(BlobError::NotFound(key)) => return Err(RegistryError::NotFound(key)),
            Err(err) => return Err(RegistryError::Storage(err)),
        }
        if let Err(err) = self.store.delete(&src).await {
            warn!(%src, %dst, error = %err, "copied but failed to delete source object");
        }
        Ok(())
    }

    pub async fn cookie_exists(&self, username: &str) -> Result<bool, RegistryError> {
        self.exists(COOKIES, username).await
    }

    /// Caches a session cookie for `username`. Write-once: an existing
    /// entry is kept and the new value is dropped.
    pub async fn put_cookie(&self, username: &str, cookie: &str) -> Result<(), RegistryError> {
        if self.cookie_exists(username).await? {
            info!(username, "cookie already cached, keeping existing entry");
            return Ok(());
        }
        self.put(COOKIES, username, cookie.as_bytes()).await
    }

    pub async fn get_cookie(&self, username: &str) -> Result<String, RegistryError> {
        let content = self.get(COOKIES, username).await?;
        String::from_utf8(content).map_err(|_| RegistryError::CorruptCookie(username.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;

    fn registry_over(store: Arc<MemoryBlobStore>) -> Registry {
        let key = StorageKey::from_hex(&"11".repeat(32)).unwrap();
        Registry::new(store, key)
    }

    #[tokio::test]
    async fn put_get_roundtrip_stores_only_ciphertext() {
        let store = Arc::new(MemoryBlobStore::new());
        let registry = registry_over(store.clone());

        registry.put(REGISTRY, "entry", b"plain content").await.unwrap();

        let raw = store.get("registry/entry").await.unwrap();
        assert!(!raw
            .windows(b"plain content".len())
            .any(|window| window == b"plain content"));

        assert_eq!(registry.get(REGISTRY, "entry").await.unwrap(), b"plain content");
    }

    #[tokio::test]
    async fn get_reports_missing_entries_as_not_found() {
        let registry = registry_over(Arc::new(MemoryBlobStore::new()));
        let err = registry.get(REGISTRY, "absent").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn tampered_object_fails_to_open() {
        let store = Arc::new(MemoryBlobStore::new());
        let registry = registry_over(store.clone());

        registry.put(REGISTRY, "entry", b"content").await.unwrap();
        let mut raw = store.get("registry/entry").await.unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xff;
        store.put("registry/entry", &raw).await.unwrap();

        assert!(matches!(
            registry.get(REGISTRY, "entry").await,
            Err(RegistryError::Sealed(SealError::Authentication))
        ));
    }

    #[tokio::test]
    async fn list_drains_every_page() {
        let store = Arc::new(MemoryBlobStore::with_page_size(2));
        let registry = registry_over(store);

        for index in 0..7 {
            registry
                .put(REGISTRY, &format!("entry-{index}"), b"content")
                .await
                .unwrap();
        }

        let names = registry.list(REGISTRY).await.unwrap();
        assert_eq!(names.len(), 7);
        assert!(names.contains(&"entry-6".to_string()));
    }

    #[tokio::test]
    async fn move_object_removes_source_and_keeps_content() {
        let registry = registry_over(Arc::new(MemoryBlobStore::new()));
        registry.put(REGISTRY, "entry", b"content").await.unwrap();

        registry.move_object(REGISTRY, "entry", QUEUED).await.unwrap();

        assert!(!registry.exists(REGISTRY, "entry").await.unwrap());
        assert_eq!(registry.get(QUEUED, "entry").await.unwrap(), b"content");
    }

    #[tokio::test]
    async fn move_of_absent_object_is_not_found() {
        let registry = registry_over(Arc::new(MemoryBlobStore::new()));
        let err = registry
            .move_object(REGISTRY, "absent", QUEUED)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn traversal_names_cannot_reach_other_namespaces_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let key = StorageKey::from_hex(&"11".repeat(32)).unwrap();
        let registry = Registry::new(Arc::new(crate::blob::FsBlobStore::new(dir.path())), key);

        registry
            .put_cookie("alice", "ASP.NET_SessionId=secret")
            .await
            .unwrap();

        let err = registry
            .get(REGISTRY, "../cookies/alice")
            .await
            .unwrap_err();
        assert!(
            matches!(err, RegistryError::Storage(BlobError::InvalidKey(_))),
            "traversal name resolved instead of being refused: {err}"
        );
    }

    #[tokio::test]
    async fn cookie_cache_is_write_once() {
        let registry = registry_over(Arc::new(MemoryBlobStore::new()));

        registry.put_cookie("alice", "session-one").await.unwrap();
        registry.put_cookie("alice", "session-two").await.unwrap();

        assert_eq!(registry.get_cookie("alice").await.unwrap(), "session-one");
    }
}
