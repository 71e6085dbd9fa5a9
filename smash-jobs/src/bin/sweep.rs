use std::sync::Arc;

use chrono::Utc;
use smash_jobs::sweep::{run_sweep, target_date};
use smash_store::{FsBlobStore, Registry, SecretBundle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smash_jobs=debug,sweep=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Scheduled job: log and terminate, retry belongs to the scheduler.
    if let Err(err) = run().await {
        tracing::error!("sweep failed: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = smash_store::app_config::Config::load()?;
    let zone = config.sweep.reference_zone()?;

    let bundle = SecretBundle::load(&config.secret.bundle_path).await?;
    let key = bundle.storage_key()?;

    let store = Arc::new(FsBlobStore::new(&config.storage.root));
    let registry = Registry::new(store, key);

    let target = target_date(Utc::now(), zone, config.sweep.lead_days);
    tracing::info!(%target, "starting registry sweep");

    let report = run_sweep(&registry, target).await?;
    tracing::info!(
        scanned = report.scanned,
        promoted = report.promoted.len(),
        "sweep finished"
    );
    Ok(())
}
