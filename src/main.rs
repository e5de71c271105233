use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use shortcut_client::config::ClientConfig;
use shortcut_client::services::api::ShortcutApi;
use shortcut_client::services::client::JobClient;
use shortcut_client::services::progress::ConsoleProgress;

/// Upload a video to the Shortcut API and wait for the processed results.
#[derive(Debug, Parser)]
#[command(name = "shortcut", version)]
struct Cli {
    /// Path to the video file to process
    file: PathBuf,

    /// Processing options forwarded to the server as JSON, inline or @file
    #[arg(long)]
    configuration: Option<String>,

    /// Disable the console progress bar
    #[arg(long)]
    quiet: bool,

    /// Give up if the job has not finished after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() {
    // Initialize structured logging; keep stdout clean for the results summary
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env().map_err(|e| {
        format!("configuration error: {e}. Set SHORTCUT_API_KEY in the environment or a .env file")
    })?;

    if !cli.file.is_file() {
        return Err(format!("file not found: {}", cli.file.display()).into());
    }

    let configuration = cli
        .configuration
        .as_deref()
        .map(parse_configuration)
        .transpose()?;

    let mut poll_config = config.poll_config();
    if let Some(secs) = cli.timeout_secs {
        poll_config.max_duration = Some(Duration::from_secs(secs));
    }

    let api = Arc::new(ShortcutApi::new(&config.api_url, &config.api_key)?);

    // Ctrl-C stops the poll loop instead of killing requests mid-flight
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping");
            signal_token.cancel();
        }
    });

    let mut client = JobClient::new(api.clone(), api.clone(), api)
        .with_poll_config(poll_config)
        .with_cancellation(cancel);
    if !cli.quiet {
        client = client.with_sink(Arc::new(ConsoleProgress::new()));
    }

    let results = client.run(&cli.file, configuration.as_ref()).await?;

    let rule = "=".repeat(50);
    println!("{rule}");
    println!("RESULTS");
    println!("{rule}");
    print!("{}", results.summary());
    println!("{rule}");

    Ok(())
}

/// Accepts inline JSON or `@path` to a JSON file.
fn parse_configuration(raw: &str) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read configuration file {path}: {e}"))?,
        None => raw.to_string(),
    };
    serde_json::from_str(&text).map_err(|e| format!("invalid configuration JSON: {e}").into())
}
