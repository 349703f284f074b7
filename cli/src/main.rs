use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use coffinjoe::shutdown::spawn_signal_listener;
use coffinjoe::telemetry::init_tracing;
use coffinjoe::{run, Cli, Config, Outcome};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::from(Cli::parse());
    init_tracing(&config.log_level);

    let cancel = CancellationToken::new();
    let _signals = spawn_signal_listener(cancel.clone());

    match fetch_and_export(&config, cancel).await {
        Ok(Outcome::Exported { records, .. }) => {
            tracing::info!(records, "export finished");
            ExitCode::SUCCESS
        }
        Ok(Outcome::Cancelled) => {
            tracing::info!("exiting");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn fetch_and_export(config: &Config, cancel: CancellationToken) -> anyhow::Result<Outcome> {
    run(config, cancel)
        .await
        .with_context(|| format!("failed to export death certificates for {}", config.date))
}
