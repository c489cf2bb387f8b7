// Tracing setup shared by both binaries. Logs go to a file so stdout stays
// free for the interactive menu.

use anyhow::Context;

const DEFAULT_FILTER: &str = "gridiron_core=info,gridiron_football=info,gridiron_app=info,warn";

/// Install a global fmt subscriber writing to `logs/<name>.log`.
///
/// The filter comes from `RUST_LOG` when set, otherwise info for the
/// workspace crates and warn for everything else.
pub fn init_tracing(name: &str) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(format!("{name}.log")))
        .context("failed to open log file")?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
