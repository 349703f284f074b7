//! Stateless SOAP request builder and response parser for `CertidaoService`.
//!
//! # Design
//! `CertidaoClient` holds only the service URL and the credentials and keeps
//! no per-request state, so one instance can serve any number of calls. The
//! `getObitos` operation is split into `build_get_obitos`, which produces an
//! `HttpRequest`, and `parse_get_obitos`, which consumes an `HttpResponse`.
//! The caller executes the round-trip in between.

use std::fmt;

use url::Url;

use crate::decode::decode_response;
use crate::envelope::render_get_obitos;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, SOAP_CONTENT_TYPE};
use crate::sanitize::sanitize;
use crate::types::CertificateRecord;

/// Production endpoint of the registry's certificate service.
pub const DEFAULT_HOST: &str = "https://selo.tjsc.jus.br/selo/CertidaoService";

/// Username and password sent inside every SOAP body.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Synchronous, stateless client for the death-certificate service.
#[derive(Debug, Clone)]
pub struct CertidaoClient {
    host: String,
    credentials: Credentials,
}

impl CertidaoClient {
    pub fn new(host: &str, credentials: Credentials) -> Self {
        Self {
            host: host.trim().to_string(),
            credentials,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Build the `getObitos` request for `date` (`YYYY-MM-DD`).
    pub fn build_get_obitos(&self, date: &str) -> Result<HttpRequest, ApiError> {
        let url = Url::parse(&self.host).map_err(|e| ApiError::UrlParse {
            url: self.host.clone(),
            reason: e.to_string(),
        })?;
        let body = render_get_obitos(&self.credentials.username, &self.credentials.password, date)?;
        Ok(HttpRequest {
            url: url.into(),
            headers: vec![("content-type".to_string(), SOAP_CONTENT_TYPE.to_string())],
            body,
        })
    }

    /// Parse a `getObitos` response into one record per returned entry.
    pub fn parse_get_obitos(&self, response: HttpResponse) -> Result<Vec<CertificateRecord>, ApiError> {
        check_status(&response, 200)?;
        let text = sanitize(&response.body);
        Ok(decode_response(&text)?.into_records())
    }
}

/// Map any status other than `expected` to `UnexpectedStatus`, leaving the
/// body undecoded.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    if response.status == expected {
        return Ok(());
    }
    Err(ApiError::UnexpectedStatus {
        status: response.status,
        body: String::from_utf8_lossy(&response.body).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> CertidaoClient {
        CertidaoClient::new(
            "https://selo.example/selo/CertidaoService",
            Credentials::new("convenio_cge", "myp1y2MOds"),
        )
    }

    fn ok(body: &[u8]) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: body.to_vec(),
        }
    }

    const TWO_ENTRIES: &str = r#"<S:Envelope xmlns:S="http://schemas.xmlsoap.org/soap/envelope/"><S:Body><ns2:getObitosResponse xmlns:ns2="http://www.tjsc.jus.br/selo"><listaObitos Hjid="1"><nome>Ana</nome></listaObitos><listaObitos Hjid="2"><nome>Rui</nome></listaObitos></ns2:getObitosResponse></S:Body></S:Envelope>"#;

    #[test]
    fn build_get_obitos_produces_soap_post() {
        let req = client().build_get_obitos("2018-06-04").unwrap();
        assert_eq!(req.url, "https://selo.example/selo/CertidaoService");
        assert_eq!(
            req.headers,
            vec![(
                "content-type".to_string(),
                "application/soap+xml;charset=UTF-8".to_string()
            )]
        );
        let body = String::from_utf8(req.body).unwrap();
        assert!(body.contains("<user>convenio_cge</user>"));
        assert!(body.contains("<pass>myp1y2MOds</pass>"));
        assert!(body.contains("<data>2018-06-04</data>"));
    }

    #[test]
    fn invalid_host_is_a_url_error() {
        let client = CertidaoClient::new("not a url", Credentials::new("u", "p"));
        let err = client.build_get_obitos("2018-06-04").unwrap_err();
        assert!(matches!(err, ApiError::UrlParse { ref url, .. } if url == "not a url"));
    }

    #[test]
    fn invalid_date_is_passed_through() {
        let req = client().build_get_obitos("04/06/2018").unwrap();
        assert!(String::from_utf8(req.body).unwrap().contains("<data>04/06/2018</data>"));
    }

    #[test]
    fn parse_returns_exactly_one_record_per_entry() {
        let records = client().parse_get_obitos(ok(TWO_ENTRIES.as_bytes())).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text("nome"), Some("Ana"));
        assert_eq!(records[1].text("nome"), Some("Rui"));
    }

    #[test]
    fn parse_drops_invalid_bytes_before_decoding() {
        let (head, tail) = TWO_ENTRIES.split_once("Ana").unwrap();
        let body = [head.as_bytes(), b"Jos\xe9", tail.as_bytes()].concat();
        assert!(std::str::from_utf8(&body).is_err());

        let records = client().parse_get_obitos(ok(&body)).unwrap();
        assert_eq!(records[0].text("nome"), Some("Jos"));
    }

    #[test]
    fn non_200_is_unexpected_status_without_decoding() {
        let response = HttpResponse {
            status: 500,
            headers: Vec::new(),
            body: TWO_ENTRIES.as_bytes().to_vec(),
        };
        let err = client().parse_get_obitos(response).unwrap_err();
        assert!(matches!(err, ApiError::UnexpectedStatus { status: 500, .. }));
    }

    #[test]
    fn garbage_body_is_a_decode_error() {
        let err = client().parse_get_obitos(ok(b"<html>oops</html>")).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn credentials_debug_hides_password() {
        let shown = format!("{:?}", Credentials::new("convenio_cge", "myp1y2MOds"));
        assert!(shown.contains("convenio_cge"));
        assert!(!shown.contains("myp1y2MOds"));
    }
}
