//! I/O-free client core for the registry's death-certificate SOAP service.
//!
//! # Overview
//! Builds the `getObitos` SOAP request as an `HttpRequest` and turns the
//! service's `HttpResponse` into `CertificateRecord`s, without touching the
//! network (host-does-IO pattern). The exporters then write the records to
//! `<stem>.json` and `<stem>.xml`.
//!
//! # Design
//! - `CertidaoClient` holds the service URL and credentials and nothing else.
//! - The pipeline is build → (host executes) → status check → sanitize →
//!   decode → export, each stage failing with its own `ApiError` variant.
//! - Records are schema-less ordered maps; the certificate schema belongs to
//!   the service.

pub mod client;
pub mod decode;
pub mod envelope;
pub mod error;
pub mod export;
pub mod http;
pub mod sanitize;
pub mod types;

pub use client::{CertidaoClient, Credentials, DEFAULT_HOST};
pub use decode::{decode_response, ResponseEntry, ResponseEnvelope};
pub use error::ApiError;
pub use export::{export_json, export_xml, records_from_json, records_from_xml};
pub use http::{HttpRequest, HttpResponse, SOAP_CONTENT_TYPE};
pub use sanitize::sanitize;
pub use types::{CertificateRecord, FieldValue};
