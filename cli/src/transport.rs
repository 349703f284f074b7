//! HTTPS execution of core `HttpRequest`s.
//!
//! # Design
//! The core never performs I/O; this is the host side of that split. A single
//! `reqwest::Client` is built per `Transport` with a bounded idle pool, so a
//! reused transport cannot accumulate connections. The response body is read
//! to the end before returning, which releases the connection on every path.

use std::error::Error as StdError;
use std::time::Duration;

use coffinjoe_core::{ApiError, HttpRequest, HttpResponse};

/// Connection pool and timeout settings for the HTTP transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Overall limit for one request, connect through last body byte.
    pub timeout: Duration,
    pub pool_max_idle: usize,
    pub pool_idle_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            pool_max_idle: 50,
            pool_idle_timeout: Duration::from_secs(60 * 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
}

impl Transport {
    pub fn new(config: &TransportConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle)
            .pool_idle_timeout(config.pool_idle_timeout)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Transport(error_chain(&e)))?;
        Ok(Self { http })
    }

    /// POST `request` and collect the full response.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut builder = self.http.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .body(request.body)
            .send()
            .await
            .map_err(|e| ApiError::Transport(error_chain(&e)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Transport(error_chain(&e))
            } else {
                ApiError::Read(error_chain(&e))
            }
        })?;

        Ok(HttpResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

/// `reqwest` errors keep the interesting part (refused, timed out, DNS) in
/// their source chain.
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
