use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use smash_store::app_config::DispatchConfig;
use tokio::time::{sleep_until, Instant};
use tracing::info;

/// Fixed burst schedule: one submission at the target instant and three
/// more spread over the following 1.5 seconds. Redundancy against jitter
/// and clock drift comes entirely from these pre-scheduled offsets; there
/// is no reactive retry.
pub const DISPATCH_OFFSETS_MS: [u64; 4] = [0, 500, 1000, 1500];

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("missing or invalid dispatch configuration: {0}")]
    Configuration(String),

    #[error("submission at offset {offset_ms}ms failed: {source}")]
    Transport {
        offset_ms: u64,
        source: anyhow::Error,
    },

    #[error("dispatch worker panicked")]
    Join,
}

#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub status: u16,
}

/// Seam for the HTTP transport so dispatch timing is testable without a
/// network.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, url: &str, cookie: &str) -> anyhow::Result<SubmissionOutcome>;
}

pub struct HttpSubmitter {
    client: reqwest::Client,
}

impl HttpSubmitter {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpSubmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(&self, url: &str, cookie: &str) -> anyhow::Result<SubmissionOutcome> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::COOKIE, cookie)
            .send()
            .await?;
        let status = response.status().as_u16();
        info!(status, headers = ?response.headers(), "submission response");
        Ok(SubmissionOutcome { status })
    }
}

/// Everything a dispatch run needs, resolved once from configuration and
/// read-only afterwards.
#[derive(Debug, Clone)]
pub struct DispatchPlan {
    pub target: DateTime<FixedOffset>,
    pub url: String,
    pub cookie: String,
}

impl DispatchPlan {
    pub fn from_config(cfg: &DispatchConfig, zone: FixedOffset) -> Result<Self, DispatchError> {
        let target = zone
            .with_ymd_and_hms(cfg.year, cfg.month, cfg.day, cfg.hour, cfg.minute, cfg.second)
            .single()
            .ok_or_else(|| {
                DispatchError::Configuration("target date-time is not a valid civil time".into())
            })?;

        if cfg.url.is_empty()
            || cfg.session_cookie.is_empty()
            || cfg.court.is_empty()
            || cfg.time.is_empty()
            || cfg.date.is_empty()
        {
            return Err(DispatchError::Configuration(
                "booking url, query parameters, and session cookie must all be set".into(),
            ));
        }

        let url = format!(
            "{}?module=net_booking&files=booking_place&StepFlag=25&QPid={}&QTime={}&PT=1&D={}",
            cfg.url, cfg.court, cfg.time, cfg.date
        );

        Ok(Self {
            target,
            url,
            cookie: cfg.session_cookie.clone(),
        })
    }
}

/// One completed submission attempt.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub offset_ms: u64,
    pub fired_at: DateTime<Utc>,
    /// Monotonic fire time, for asserting the burst schedule in tests.
    pub fired_instant: Instant,
    pub status: u16,
}

/// Fires the offset burst around the plan's target instant.
///
/// Each worker maps its own absolute wall-clock deadline `T + offset` onto
/// the monotonic clock once at spawn and sleeps until that instant, so
/// drift never compounds across workers. All workers always fire and are
/// joined before any outcome is inspected; a transport failure on any one
/// of them fails the invocation as a whole after the barrier.
pub async fn run_dispatch(
    plan: &DispatchPlan,
    submitter: Arc<dyn Submitter>,
) -> Result<Vec<Attempt>, DispatchError> {
    let target = plan.target.with_timezone(&Utc);
    info!(%target, "dispatch armed, time until target: {}", target - Utc::now());

    let mut workers = Vec::with_capacity(DISPATCH_OFFSETS_MS.len());
    for offset_ms in DISPATCH_OFFSETS_MS {
        let submitter = Arc::clone(&submitter);
        let url = plan.url.clone();
        let cookie = plan.cookie.clone();

        workers.push(tokio::spawn(async move {
            let deadline = target + Duration::milliseconds(offset_ms as i64);
            // A deadline already in the past fires immediately.
            let wait = (deadline - Utc::now()).to_std().unwrap_or_default();
            sleep_until(Instant::now() + wait).await;

            let fired_instant = Instant::now();
            let fired_at = Utc::now();
            info!(offset_ms, %fired_at, "submission fired");

            let outcome = submitter.submit(&url, &cookie).await;
            (offset_ms, fired_at, fired_instant, outcome)
        }));
    }

    // Join barrier: every offset fires before any error is surfaced.
    let mut attempts = Vec::with_capacity(workers.len());
    let mut failure: Option<DispatchError> = None;
    for worker in workers {
        let (offset_ms, fired_at, fired_instant, outcome) =
            worker.await.map_err(|_| DispatchError::Join)?;
        match outcome {
            Ok(outcome) => attempts.push(Attempt {
                offset_ms,
                fired_at,
                fired_instant,
                status: outcome.status,
            }),
            Err(source) => {
                if failure.is_none() {
                    failure = Some(DispatchError::Transport { offset_ms, source });
                }
            }
        }
    }

    match failure {
        Some(err) => Err(err),
        None => Ok(attempts),
    }
}
