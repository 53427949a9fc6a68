//! Background jobs.
//!
//! The daily generations reset sleeps until the next local midnight in the
//! configured time zone, resets every user's counter, and repeats.

use std::time::Duration;

use artfeed_common::{AppError, AppResult, config::GenerationsConfig};
use artfeed_db::repositories::UserRepository;
use chrono::{DateTime, Days, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Time from `now` until the next midnight in `tz`.
///
/// If that midnight does not exist locally (a DST gap), the first valid
/// instant after it is used.
#[must_use]
pub fn duration_until_next_midnight(now: DateTime<Utc>, tz: Tz) -> Duration {
    let local = now.with_timezone(&tz);
    let Some(tomorrow) = local.date_naive().checked_add_days(Days::new(1)) else {
        return Duration::from_secs(24 * 60 * 60);
    };

    let midnight = tomorrow.and_time(NaiveTime::MIN);
    let next = (0..=2)
        .find_map(|hours| {
            tz.from_local_datetime(&(midnight + chrono::Duration::hours(hours)))
                .earliest()
        })
        .map_or(now + chrono::Duration::days(1), |dt| dt.with_timezone(&Utc));

    (next - now).to_std().unwrap_or(Duration::ZERO)
}

/// Resets every user's daily generation allotment at local midnight.
#[derive(Clone)]
pub struct DailyGenerationsJob {
    user_repo: UserRepository,
    allotment: i32,
    time_zone: Tz,
}

impl DailyGenerationsJob {
    /// Build the job from configuration. Fails on an unknown time zone.
    pub fn new(user_repo: UserRepository, config: &GenerationsConfig) -> AppResult<Self> {
        let time_zone = config
            .time_zone
            .parse::<Tz>()
            .map_err(|e| AppError::Config(format!("Invalid time zone {}: {e}", config.time_zone)))?;

        Ok(Self {
            user_repo,
            allotment: config.per_day,
            time_zone,
        })
    }

    /// Reset every user's counter once.
    pub async fn run_once(&self) -> AppResult<u64> {
        let updated = self.user_repo.update_daily_generations(self.allotment).await?;
        info!(users = updated, allotment = self.allotment, "Daily generations updated for all users");
        Ok(updated)
    }

    /// Run forever on a background task. Failures are logged and the loop
    /// waits for the next midnight.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(time_zone = %self.time_zone, "Daily generations job started");
            loop {
                let wait = duration_until_next_midnight(Utc::now(), self.time_zone);
                tokio::time::sleep(wait).await;

                if let Err(e) = self.run_once().await {
                    error!(error = %e, "Failed to update daily generations");
                }
            }
        })
    }
}
