use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use smash_core::Reservation;
use smash_store::registry::{Registry, RegistryError, QUEUED, REGISTRY};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("registry entry {name} is not a valid reservation: {source}")]
    Malformed {
        name: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Default)]
pub struct SweepReport {
    pub scanned: usize,
    pub promoted: Vec<String>,
}

/// Calendar date the sweep promotes: today in the reference zone plus the
/// configured lead time.
pub fn target_date(now: DateTime<Utc>, zone: FixedOffset, lead_days: i64) -> NaiveDate {
    (now.with_timezone(&zone) + Duration::days(lead_days)).date_naive()
}

/// Promotes every pending entry whose reservation day equals `target` from
/// `registry/` to `queued/`.
///
/// The whole namespace is enumerated (all pages). A decrypt or parse
/// failure on any entry aborts the invocation: partial progress is worse
/// than a loud failure here, since the external scheduler re-runs the job
/// and promotion of already-moved entries is a no-op.
pub async fn run_sweep(registry: &Registry, target: NaiveDate) -> Result<SweepReport, SweepError> {
    let mut report = SweepReport::default();

    for name in registry.list(REGISTRY).await? {
        let content = registry.get(REGISTRY, &name).await?;
        let reservation = Reservation::from_slice(&content).map_err(|source| {
            SweepError::Malformed {
                name: name.clone(),
                source,
            }
        })?;
        report.scanned += 1;

        if reservation.reserve_date.date_naive() == target {
            info!(entry = %name, %target, "promoting reservation to queued");
            registry.move_object(REGISTRY, &name, QUEUED).await?;
            report.promoted.push(name);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smash_store::{MemoryBlobStore, StorageKey};
    use std::sync::Arc;

    fn test_registry() -> Registry {
        let key = StorageKey::from_hex(&"33".repeat(32)).unwrap();
        Registry::new(Arc::new(MemoryBlobStore::with_page_size(2)), key)
    }

    fn reservation_on(date: &str) -> Reservation {
        Reservation {
            username: "alice".to_string(),
            password: "hunter2".to_string(),
            reserve_date: DateTime::parse_from_rfc3339(&format!("{date}T10:00:00+08:00"))
                .unwrap(),
            reserve_court: "3".to_string(),
            reserve_time: "1800".to_string(),
        }
    }

    async fn seed(registry: &Registry, name: &str, date: &str) {
        let content = reservation_on(date).to_bytes().unwrap();
        registry.put(REGISTRY, name, &content).await.unwrap();
    }

    #[test]
    fn target_date_is_lead_days_ahead_in_the_reference_zone() {
        let zone = FixedOffset::east_opt(8 * 3600).unwrap();
        // 23:00 UTC is already the next day in UTC+8
        let now = DateTime::parse_from_rfc3339("2024-05-17T23:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            target_date(now, zone, 14),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
    }

    #[tokio::test]
    async fn only_the_target_day_entry_is_promoted() {
        let registry = test_registry();
        seed(&registry, "before", "2024-05-31").await;
        seed(&registry, "exact", "2024-06-01").await;
        seed(&registry, "after", "2024-06-02").await;

        let target = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let report = run_sweep(&registry, target).await.unwrap();

        assert_eq!(report.scanned, 3);
        assert_eq!(report.promoted, vec!["exact".to_string()]);
        assert!(!registry.exists(REGISTRY, "exact").await.unwrap());
        assert!(registry.exists(QUEUED, "exact").await.unwrap());
        assert!(registry.exists(REGISTRY, "before").await.unwrap());
        assert!(registry.exists(REGISTRY, "after").await.unwrap());
    }

    #[tokio::test]
    async fn rerunning_the_sweep_is_a_noop() {
        let registry = test_registry();
        seed(&registry, "exact", "2024-06-01").await;

        let target = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        run_sweep(&registry, target).await.unwrap();
        let second = run_sweep(&registry, target).await.unwrap();

        assert_eq!(second.scanned, 0);
        assert!(second.promoted.is_empty());
        assert!(registry.exists(QUEUED, "exact").await.unwrap());
    }

    #[tokio::test]
    async fn sweep_drains_every_listing_page() {
        let registry = test_registry();
        for index in 0..7 {
            seed(&registry, &format!("entry-{index}"), "2024-06-01").await;
        }

        let target = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let report = run_sweep(&registry, target).await.unwrap();

        assert_eq!(report.scanned, 7);
        assert_eq!(report.promoted.len(), 7);
        assert!(registry.list(REGISTRY).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn a_malformed_entry_aborts_the_whole_sweep() {
        let registry = test_registry();
        seed(&registry, "good", "2024-06-01").await;
        registry.put(REGISTRY, "junk", b"not a reservation").await.unwrap();

        let target = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let err = run_sweep(&registry, target).await.unwrap_err();
        assert!(matches!(err, SweepError::Malformed { .. }));
    }
}
