//! EPL signal arbitration engine - entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// EPL signal arbitration and tiered dissemination runner
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via EPL_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Candidate JSONL file ("-" for stdin); overrides the config file
    #[arg(short, long)]
    input: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // CLI arg > EPL_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("EPL_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    let mut config = epl_bot::AppConfig::from_file(&config_path)?;
    if let Some(input) = args.input {
        config.feed.input = Some(input);
    }

    epl_telemetry::init_logging(config.telemetry.log_level.as_deref())?;
    info!("Starting EPL v{}", env!("CARGO_PKG_VERSION"));
    info!(
        config_path = %config_path,
        channels = ?config.channels.enabled,
        input = config.feed.path().unwrap_or("stdin"),
        "Configuration loaded"
    );

    let mut app = epl_bot::Application::new(config)?;
    app.run().await?;

    Ok(())
}
