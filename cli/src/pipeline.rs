//! Fetch-then-export, raced against the shutdown token.

use std::path::PathBuf;

use coffinjoe_core::{export_json, export_xml, ApiError};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::fetch::DeathCertificateClient;

/// How an invocation ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Exported {
        records: usize,
        json: PathBuf,
        xml: PathBuf,
    },
    /// A shutdown signal arrived before the fetch finished. Nothing was
    /// written.
    Cancelled,
}

/// Fetch the certificates for `config.date` and write both export files.
///
/// Cancelling `cancel` aborts the in-flight request. Once the records are in
/// hand the exports run to completion.
pub async fn run(config: &Config, cancel: CancellationToken) -> Result<Outcome, ApiError> {
    let client = DeathCertificateClient::new(config)?;

    let records = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!("request cancelled");
            return Ok(Outcome::Cancelled);
        }
        result = client.get_by_date(&config.date) => result?,
    };

    let json = export_json(&records, &config.output)?;
    info!(path = %json.display(), "wrote JSON export");
    let xml = export_xml(&records, &config.output)?;
    info!(path = %xml.display(), "wrote XML export");

    Ok(Outcome::Exported {
        records: records.len(),
        json,
        xml,
    })
}
