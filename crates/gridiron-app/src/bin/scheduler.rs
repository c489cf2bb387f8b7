// Background refresher: runs a full data refresh at startup and then daily
// at the configured time until Ctrl+C.

use gridiron_app::fetch::HttpStatsSource;
use gridiron_app::logging::init_tracing;
use gridiron_app::refresh::scheduled_refresh;
use gridiron_app::scheduler::run_daily;
use gridiron_core::config;
use gridiron_core::db::Database;

use anyhow::Context;
use chrono::Local;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing("gridiron-scheduler")?;

    let config = config::load_config().context("failed to load configuration")?;
    let db = Database::open(&config.db_path).context("failed to open database")?;
    let source = HttpStatsSource::new(&config.api)?;

    let weeks = config.refresh.weeks_to_fetch;
    let at = config.refresh.time;

    println!("Scheduler started. Daily refresh at {at}. Press Ctrl+C to stop.");
    info!("Scheduler started: daily refresh at {}, {} weeks", at, weeks);

    let (config, source, db) = (&config, &source, &db);
    run_daily(
        at,
        move || async move {
            let today = Local::now().date_naive();
            match scheduled_refresh(source, db, config, today).await {
                Ok(summary) => info!(
                    "Scheduled refresh stored {} stat rows",
                    summary.stat_rows()
                ),
                Err(e) => error!("Scheduled refresh failed: {}", e),
            }
        },
        async {
            let _ = tokio::signal::ctrl_c().await;
        },
    )
    .await;

    println!("Scheduler stopped.");
    Ok(())
}
