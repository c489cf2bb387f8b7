// Daily refresh scheduler: run once at startup, then every day at the
// configured wall-clock time until shutdown.

use std::future::Future;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tracing::info;

use gridiron_core::config::RefreshTime;

/// Next occurrence of `at` strictly after `now`.
pub fn next_run_after(now: NaiveDateTime, at: RefreshTime) -> NaiveDateTime {
    let today = now.date().and_time(at.as_naive_time());
    if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

/// Run `job` immediately and then daily at `at`, until `shutdown` resolves.
///
/// A shutdown that arrives while a job is running takes effect once the job
/// returns.
pub async fn run_daily<F, Fut, S>(at: RefreshTime, mut job: F, shutdown: S)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    job().await;

    loop {
        let now = Local::now().naive_local();
        let next = next_run_after(now, at);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        info!("Next refresh at {} (in {}s)", next, wait.as_secs());

        tokio::select! {
            _ = tokio::time::sleep(wait) => job().await,
            _ = &mut shutdown => {
                info!("Scheduler shutting down");
                break;
            }
        }
    }
}
