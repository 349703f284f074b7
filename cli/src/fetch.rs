//! The networked client: core request building plus the HTTP transport.

use coffinjoe_core::{ApiError, CertidaoClient, CertificateRecord};
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::transport::Transport;

/// Fetches death certificates for a date. Holds no per-request state, so one
/// instance can be reused for any number of calls.
#[derive(Debug, Clone)]
pub struct DeathCertificateClient {
    api: CertidaoClient,
    transport: Transport,
}

impl DeathCertificateClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        Ok(Self {
            api: CertidaoClient::new(&config.host, config.credentials.clone()),
            transport: Transport::new(&config.transport)?,
        })
    }

    #[instrument(skip(self), fields(host = %self.api.host()))]
    pub async fn get_by_date(&self, date: &str) -> Result<Vec<CertificateRecord>, ApiError> {
        let request = self.api.build_get_obitos(date)?;
        debug!(bytes = request.body.len(), "sending getObitos");

        let response = self.transport.execute(request).await?;
        debug!(status = response.status, bytes = response.body.len(), "response received");

        let records = self.api.parse_get_obitos(response)?;
        info!(count = records.len(), "certificates decoded");
        Ok(records)
    }
}
