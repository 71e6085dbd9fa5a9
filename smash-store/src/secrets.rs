use std::path::Path;

use serde::Deserialize;

use crate::sealed::{SealError, StorageKey};

/// Secret payload delivered by the external secret manager: a JSON object
/// with one field carrying the 64-hex-character storage key.
#[derive(Debug, Deserialize)]
pub struct SecretBundle {
    #[serde(rename = "storage-enc")]
    pub storage_enc: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("failed to read secret bundle: {0}")]
    Io(#[from] std::io::Error),

    #[error("secret bundle is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Key(#[from] SealError),
}

impl SecretBundle {
    pub fn from_json(raw: &str) -> Result<Self, SecretError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Reads the bundle from the path the secret manager mounts it at.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SecretError> {
        let raw = tokio::fs::read_to_string(path).await?;
        Self::from_json(&raw)
    }

    pub fn storage_key(&self) -> Result<StorageKey, SecretError> {
        Ok(StorageKey::from_hex(&self.storage_enc)?)
    }
}
