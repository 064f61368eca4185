//! Dubkit - Video Dubbing Backend Test Harness
//!
//! This is the main entry point. Without a subcommand the harness runs
//! its interactive menu; each menu action is also exposed directly as a
//! subcommand for scripted use.

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dubkit::cli::{Args, Commands};
use dubkit::config::Config;
use dubkit::harness::Harness;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    let config = Config::from_env();
    let harness = Harness::new(config)?;

    match args.command {
        None => harness.run_menu().await?,
        Some(Commands::Check) => harness.check_environment().await?,
        Some(Commands::Fetch { url, output_dir }) => harness.fetch_video(url, output_dir).await?,
        Some(Commands::Extract { input, output }) => harness.extract_audio(input, output).await?,
        Some(Commands::Dub { input, language }) => harness.dub_local_file(input, language).await?,
        Some(Commands::Flow { url, language }) => harness.run_backend_flow(url, language).await?,
        Some(Commands::Logs) => harness.view_logs().await?,
        Some(Commands::Emulator) => harness.emulator_status().await?,
        Some(Commands::Config) => harness.show_configuration().await?,
    }

    Ok(())
}

/// Setup logging to a rolling file, plus the console when verbose.
///
/// The menu owns the terminal, so console output stays off by default;
/// everything still lands in the file log.
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".dubkit").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "dubkit.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_ansi(false); // No ANSI colors in file

    let registry = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(file_layer);

    let init_result = if verbose {
        let console_layer = fmt::layer().with_target(false);
        registry.with(console_layer).try_init()
    } else {
        registry.try_init()
    };
    init_result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - file: {}", log_dir.join("dubkit.log").display());

    Ok(())
}
