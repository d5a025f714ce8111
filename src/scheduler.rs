use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::time::MissedTickBehavior;

/// Fires once a day at a fixed wall-clock time in a fixed timezone.
#[derive(Debug, Clone, Copy)]
pub struct DailySchedule {
    at: NaiveTime,
    tz: Tz,
}

impl DailySchedule {
    pub fn new(at: NaiveTime, tz: Tz) -> Self {
        Self { at, tz }
    }

    /// First occurrence strictly after `instant`. Local times skipped by a
    /// DST jump move on to the next day.
    pub fn next_after(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let mut date = instant.with_timezone(&self.tz).date_naive();

        for _ in 0..3 {
            if let Some(candidate) = self
                .tz
                .from_local_datetime(&date.and_time(self.at))
                .earliest()
                .map(|local| local.with_timezone(&Utc))
                .filter(|candidate| *candidate > instant)
            {
                return candidate;
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }

        instant + chrono::Duration::days(1)
    }
}

/// Runs `job` every day per `schedule` until `shutdown` resolves.
///
/// The timer is polled every `poll_interval` and compares `clock()` with the
/// next due time. With `run_on_startup` the first tick is already due, so the
/// shutdown future has been polled once before any run starts. A run always
/// completes before the shutdown signal is looked at again.
pub async fn run<C, S, F, Fut>(
    schedule: &DailySchedule,
    poll_interval: Duration,
    run_on_startup: bool,
    clock: C,
    shutdown: S,
    mut job: F,
) where
    C: Fn() -> DateTime<Utc>,
    S: Future<Output = ()>,
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let mut next_due = if run_on_startup {
        tracing::info!("Running report immediately on startup");
        clock()
    } else {
        let due = schedule.next_after(clock());
        tracing::info!(
            next_run = %due.with_timezone(&schedule.tz).format("%Y-%m-%d %H:%M %Z"),
            "Daily report scheduled"
        );
        due
    };

    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                tracing::info!("Scheduler received shutdown signal");
                break;
            }
            _ = interval.tick() => {
                if clock() < next_due {
                    continue;
                }

                job().await;

                next_due = schedule.next_after(clock());
                tracing::info!(
                    next_run = %next_due.with_timezone(&schedule.tz).format("%Y-%m-%d %H:%M %Z"),
                    "Waiting for next scheduled run"
                );
            }
        }
    }
}
