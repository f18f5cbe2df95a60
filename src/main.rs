use anyhow::{Context, Result};
use par_annotate::cli;
use par_annotate_config::Config;
use tokio::runtime::Runtime;

fn main() -> Result<()> {
    // Process CLI arguments first (before logging init for cleaner output)
    let options = cli::process_cli();

    let config_path = options
        .config_path
        .clone()
        .unwrap_or_else(Config::config_path);
    let config = match &options.config_path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load().unwrap_or_else(|e| {
            eprintln!("par-annotate: using default config: {e:#}");
            Config::default()
        }),
    };

    // Routes all log::info!() etc. to the debug log file; mirrors to stderr
    // when RUST_LOG is set. --log-level beats RUST_LOG beats the config.
    let level = par_annotate::debug::resolve_log_level(options.log_level, config.log_level);
    par_annotate::debug::init_log_bridge(level);

    log::info!("Starting par-annotate {}", par_annotate::VERSION);

    let runtime = Runtime::new().context("Failed to start Tokio runtime")?;
    let code = runtime.block_on(par_annotate::host::run(options, config, config_path))?;

    // Follow tasks never return on their own; don't wait for them.
    runtime.shutdown_timeout(std::time::Duration::from_secs(2));

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
