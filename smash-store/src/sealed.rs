use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};

/// Sealed objects are laid out as `nonce ‖ ciphertext` on the wire.
pub const NONCE_LEN: usize = 24;

/// 256-bit symmetric key for sealing registry objects.
///
/// Constructed once per process from the secret bundle and passed by
/// reference into every component. The raw bytes never leave this type.
#[derive(Clone)]
pub struct StorageKey([u8; 32]);

impl StorageKey {
    /// Parses the 64-hex-character encoding used by the secret payload.
    pub fn from_hex(encoded: &str) -> Result<Self, SealError> {
        let bytes = hex::decode(encoded.trim()).map_err(|_| SealError::InvalidKey)?;
        let key: [u8; 32] = bytes.try_into().map_err(|_| SealError::InvalidKey)?;
        Ok(Self(key))
    }
}

impl std::fmt::Debug for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StorageKey(..)")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SealError {
    #[error("encryption key must be 64 hex characters")]
    InvalidKey,

    #[error("sealed object is shorter than a nonce")]
    Truncated,

    #[error("authentication failed while opening sealed object")]
    Authentication,

    #[error("encryption failed")]
    Encryption,
}

/// Authenticated-encrypts `plaintext` under `key` with a fresh random
/// 24-byte nonce. The nonce is prepended to the returned ciphertext.
pub fn seal(key: &StorageKey, plaintext: &[u8]) -> Result<Vec<u8>, SealError> {
    let cipher = XChaCha20Poly1305::new((&key.0).into());
    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| SealError::Encryption)?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(nonce.as_slice());
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Splits off the leading nonce and authenticated-decrypts the rest.
/// Tampered or truncated input yields an error, never partial plaintext.
pub fn open(key: &StorageKey, sealed: &[u8]) -> Result<Vec<u8>, SealError> {
    if sealed.len() < NONCE_LEN {
        return Err(SealError::Truncated);
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
    let cipher = XChaCha20Poly1305::new((&key.0).into());
    cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| SealError::Authentication)
}
