//! Error types for the death-certificate client.
//!
//! # Design
//! One variant per failure stage of the fetch/export pipeline, so callers can
//! tell a bad service URL from a refused connection, a non-200 answer, or a
//! body that is not the SOAP document we expect. Every error is terminal for
//! the current invocation; nothing here is retried.

use std::path::PathBuf;

/// Errors returned by `CertidaoClient`, the transport host and the exporters.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The configured service URL could not be parsed.
    #[error("invalid service url {url:?}: {reason}")]
    UrlParse { url: String, reason: String },

    /// The connection could not be established or the request timed out.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The service answered with something other than 200.
    #[error("unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The response body could not be read to the end.
    #[error("failed to read response body: {0}")]
    Read(String),

    /// The SOAP request envelope could not be rendered.
    #[error("failed to render request envelope: {0}")]
    Template(String),

    /// The response is not a well-formed `getObitosResponse` envelope.
    #[error("failed to decode SOAP response: {0}")]
    Decode(String),

    /// Records could not be encoded to the export format.
    #[error("failed to serialize certificates: {0}")]
    Serialization(String),

    /// An export file could not be created or written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
