use chrono::FixedOffset;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub secret: SecretConfig,
    pub sweep: SweepConfig,
    /// Only the dispatch binary needs this section; it fails fast when the
    /// section is missing or incomplete.
    pub dispatch: Option<DispatchConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory of the blob store ("bucket").
    pub root: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SecretConfig {
    /// Path the secret manager mounts the key bundle at.
    pub bundle_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SweepConfig {
    #[serde(default = "default_lead_days")]
    pub lead_days: i64,
    /// Reference zone as a whole-hour UTC offset. The booking site lives in
    /// Asia/Taipei, which has no DST, so a fixed offset is sufficient.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

fn default_lead_days() -> i64 {
    14
}

fn default_utc_offset_hours() -> i32 {
    8
}

impl SweepConfig {
    pub fn reference_zone(&self) -> Result<FixedOffset, config::ConfigError> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).ok_or_else(|| {
            config::ConfigError::Message(format!(
                "invalid utc_offset_hours: {}",
                self.utc_offset_hours
            ))
        })
    }
}

/// Submission parameters for the precise-time dispatcher. All of them come
/// from configuration/environment; nothing is resolved at fire time.
#[derive(Debug, Deserialize, Clone)]
pub struct DispatchConfig {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    #[serde(default)]
    pub second: u32,
    /// Base booking URL; court/time/date are appended as query parameters.
    pub url: String,
    pub court: String,
    pub time: String,
    pub date: String,
    /// Opaque session cookie string sent verbatim in the Cookie header.
    pub session_cookie: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file
            // Default to 'development' env
            // Note that this file is _optional_
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of SMASH)
            // Eg.. `SMASH__DISPATCH__YEAR=2026` would set the dispatch year
            .add_source(config::Environment::with_prefix("SMASH").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_defaults_match_the_booking_site() {
        let sweep: SweepConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(sweep.lead_days, 14);
        assert_eq!(sweep.utc_offset_hours, 8);
        assert_eq!(
            sweep.reference_zone().unwrap(),
            FixedOffset::east_opt(8 * 3600).unwrap()
        );
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        let sweep = SweepConfig {
            lead_days: 14,
            utc_offset_hours: 40,
        };
        assert!(sweep.reference_zone().is_err());
    }
}
