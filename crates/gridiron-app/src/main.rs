// Interactive entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open database
// 4. Build the HTTP stats source
// 5. Run the menu on stdin/stdout until the user exits

use gridiron_app::fetch::HttpStatsSource;
use gridiron_app::logging::init_tracing;
use gridiron_app::menu::Menu;
use gridiron_core::config;
use gridiron_core::db::Database;

use anyhow::Context;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing("gridiron")?;
    info!("Gridiron starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: {} teams, {} scoring, season {}",
        config.league.size,
        config.league.scoring_format,
        config.current_season()
    );

    let db = Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    let source = HttpStatsSource::new(&config.api)?;

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut menu = Menu::new(&config, &db, &source, stdin.lock(), stdout.lock())?;
    menu.run().await?;

    info!("Gridiron shut down cleanly");
    Ok(())
}
