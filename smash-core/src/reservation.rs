use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A court reservation request as submitted by a user.
///
/// The wire shape matches the intake trigger body: `reserveDate` is an
/// ISO-8601 date-time whose offset is preserved, so the calendar day the
/// user asked for never shifts under normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub username: String,
    pub password: String,
    pub reserve_date: DateTime<FixedOffset>,
    pub reserve_court: String,
    pub reserve_time: String,
}

impl Reservation {
    /// Canonical identity of this request, used as its storage key.
    ///
    /// SHA-256 of `username-YYYYMMDD-court-time`, hex encoded, with a
    /// `.json` suffix. Identical requests collapse onto one object;
    /// distinct requests get distinct names.
    pub fn fingerprint(&self) -> String {
        let seed = format!(
            "{}-{}-{}-{}",
            self.username,
            self.reserve_date.format("%Y%m%d"),
            self.reserve_court,
            self.reserve_time
        );
        format!("{}.json", hex::encode(Sha256::digest(seed.as_bytes())))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_slice(content: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(content)
    }
}

/// Whether `id` has the shape [`Reservation::fingerprint`] produces.
///
/// Lookups keyed by untrusted input must pass this before touching
/// storage; anything else (path separators included) is not a valid
/// entry name.
pub fn is_fingerprint(id: &str) -> bool {
    match id.strip_suffix(".json") {
        Some(stem) => stem.len() == 64 && stem.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}
