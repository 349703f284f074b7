//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe the SOAP exchange as plain data. The core builds an
//! `HttpRequest` and parses an `HttpResponse` without touching the network;
//! the host (the `coffinjoe` binary, or a test harness) executes the call.
//!
//! Bodies are raw bytes: the service is known to send malformed text, so the
//! response must reach the sanitizer before anything treats it as UTF-8.

/// Content type sent with every SOAP request.
pub const SOAP_CONTENT_TYPE: &str = "application/soap+xml;charset=UTF-8";

/// A SOAP request described as plain data. Always sent as a POST.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// An HTTP response described as plain data.
///
/// Constructed by the host after executing an `HttpRequest`, then passed to
/// `CertidaoClient::parse_get_obitos`.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}
