use std::sync::Arc;

use smash_jobs::dispatch::{run_dispatch, DispatchPlan, HttpSubmitter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smash_jobs=debug,dispatch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run().await {
        tracing::error!("dispatch failed: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = smash_store::app_config::Config::load()?;
    let zone = config.sweep.reference_zone()?;

    // All submission inputs come from configuration; missing dispatch
    // settings are fatal before any network I/O.
    let dispatch_config = config
        .dispatch
        .ok_or_else(|| anyhow::anyhow!("missing [dispatch] configuration"))?;
    let plan = DispatchPlan::from_config(&dispatch_config, zone)?;

    tracing::info!(target = %plan.target, url = %plan.url, "dispatch plan resolved");

    let attempts = run_dispatch(&plan, Arc::new(HttpSubmitter::new())).await?;
    for attempt in attempts {
        tracing::info!(
            offset_ms = attempt.offset_ms,
            fired_at = %attempt.fired_at,
            status = attempt.status,
            "attempt completed"
        );
    }
    Ok(())
}
