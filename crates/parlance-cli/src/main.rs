//! Parlance CLI entry point.

use parlance_cli::config::Config;
use parlance_cli::error::AppError;
use parlance_cli::runner;
use parlance_cli::script::Script;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber. Logs go to stderr; the transcript owns stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    tracing::info!("Starting Parlance script replay");

    // Read configuration from environment.
    let config = Config::from_env()?;
    let script = Script::load(&config.script)?;
    tracing::info!(
        script = %config.script.display(),
        steps = script.steps.len(),
        "script loaded"
    );

    let replay = runner::run(&config, script).await?;
    for line in &replay.transcript {
        println!("{line}");
    }
    tracing::info!(
        messages = replay.transcript.len(),
        commands = replay.commands.len(),
        "replay finished"
    );

    Ok(())
}
