//! Background job scheduling.

use crate::errors::{AppError, Result};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// When the pipeline job fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Once a day at `hour`:00 UTC.
    Daily { hour: u32 },
    /// Every `secs` seconds, first run immediately.
    Interval { secs: u64 },
}

impl Schedule {
    pub fn daily(hour: u32) -> Result<Self> {
        if hour > 23 {
            return Err(AppError::Config(format!(
                "SCHEDULE_HOUR must be between 0 and 23, got {hour}"
            )));
        }
        Ok(Self::Daily { hour })
    }

    pub fn interval(secs: u64) -> Result<Self> {
        if secs == 0 {
            return Err(AppError::Config(
                "FETCH_INTERVAL_SECS must be positive".into(),
            ));
        }
        Ok(Self::Interval { secs })
    }
}

/// Next `hour`:00 UTC strictly after `now`.
pub fn next_daily_run(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let at = |day: chrono::NaiveDate| {
        day.and_hms_opt(hour.min(23), 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive))
    };
    match at(now.date_naive()) {
        Some(today) if today > now => today,
        _ => at(now.date_naive() + ChronoDuration::days(1))
            .unwrap_or(now + ChronoDuration::days(1)),
    }
}

/// Spawn a task that runs `job` on `schedule` until the runtime shuts down.
///
/// A failed run is logged and the loop keeps going.
pub fn spawn<F, Fut, T>(schedule: Schedule, mut job: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(async move {
        let mut runs: u64 = 0;
        match schedule {
            Schedule::Daily { hour } => loop {
                let now = Utc::now();
                let next = next_daily_run(now, hour);
                info!(next_run = %next.format("%Y-%m-%d %H:%M:%S"), "[SCHED] next daily run (UTC)");
                let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
                tokio::time::sleep(wait).await;
                runs += 1;
                run_job(&mut job, runs).await;
            },
            Schedule::Interval { secs } => {
                let mut ticker = tokio::time::interval(Duration::from_secs(secs));
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                info!(secs, "[SCHED] interval scheduler started");
                loop {
                    ticker.tick().await;
                    runs += 1;
                    run_job(&mut job, runs).await;
                }
            }
        }
    })
}

async fn run_job<F, Fut, T>(job: &mut F, run: u64)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    info!(run, "[SCHED] job started");
    match job().await {
        Ok(_) => info!(run, "[SCHED] job finished"),
        Err(e) => error!(run, error = %e, "[SCHED] job failed"),
    }
}
