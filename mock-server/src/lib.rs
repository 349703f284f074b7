use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use quick_xml::{escape::escape, events::Event, Reader};
use tokio::{net::TcpListener, sync::RwLock};

pub const SERVICE_PATH: &str = "/selo/CertidaoService";

const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const SELO_NS: &str = "http://www.tjsc.jus.br/selo";

/// One `listaObitos` entry as the fake service renders it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Obito {
    pub hjid: i64,
    pub nome: String,
    pub data_obito: String,
    pub matricula: String,
    pub cartorio: String,
}

/// Everything the fake service knows: who may log in and which certificates
/// exist for which date.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    pub username: String,
    pub password: String,
    pub obitos: HashMap<String, Vec<Obito>>,
    /// Send names as single-byte Latin-1, like the legacy fields of the real
    /// service. The body is then not valid UTF-8.
    pub legacy_latin1: bool,
    /// Hold every SOAP answer back this long.
    pub delay: Option<Duration>,
}

impl Registry {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            ..Self::default()
        }
    }

    pub fn with_obito(mut self, date: &str, obito: Obito) -> Self {
        self.obitos.entry(date.to_string()).or_default().push(obito);
        self
    }

    pub fn legacy_latin1(mut self) -> Self {
        self.legacy_latin1 = true;
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

pub type Db = Arc<RwLock<Registry>>;

pub fn app(registry: Registry) -> Router {
    let db: Db = Arc::new(RwLock::new(registry));
    Router::new()
        .route(SERVICE_PATH, post(certidao_service))
        .with_state(db)
}

pub async fn run(listener: TcpListener, registry: Registry) -> Result<(), std::io::Error> {
    axum::serve(listener, app(registry)).await
}

/// The `user`, `pass` and `data` fields of a `getObitos` call.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct GetObitos {
    pub user: String,
    pub pass: String,
    pub data: String,
}

async fn certidao_service(State(db): State<Db>, headers: HeaderMap, body: Bytes) -> Response {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !content_type.starts_with("application/soap+xml") {
        return StatusCode::UNSUPPORTED_MEDIA_TYPE.into_response();
    }

    let request = match parse_get_obitos(&body) {
        Ok(request) => request,
        Err(reason) => return fault("S:Client", &reason),
    };

    let (obitos, latin1, delay) = {
        let registry = db.read().await;
        if request.user != registry.username || request.pass != registry.password {
            return fault("S:Server", "Usuário ou senha inválidos");
        }
        let obitos = registry.obitos.get(&request.data).cloned().unwrap_or_default();
        (obitos, registry.legacy_latin1, registry.delay)
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/xml;charset=utf-8")],
        render_response(&obitos, latin1),
    )
        .into_response()
}

/// Pull `user`, `pass` and `data` out of a `getObitos` envelope.
pub fn parse_get_obitos(body: &[u8]) -> Result<GetObitos, String> {
    let mut reader = Reader::from_reader(body);
    let mut buf = Vec::new();
    let mut request = GetObitos::default();
    let mut seen_operation = false;
    let mut current: Option<Vec<u8>> = None;
    loop {
        match reader.read_event_into(&mut buf).map_err(|e| e.to_string())? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                seen_operation |= name == b"getObitos";
                current = Some(name);
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| e.to_string())?.into_owned();
                match current.as_deref() {
                    Some(b"user") => request.user.push_str(&text),
                    Some(b"pass") => request.pass.push_str(&text),
                    Some(b"data") => request.data.push_str(&text),
                    _ => {}
                }
            }
            Event::End(_) => current = None,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    if !seen_operation {
        return Err("getObitos operation not found".to_string());
    }
    Ok(request)
}

/// Render a `getObitosResponse` envelope holding one `listaObitos` per entry.
pub fn render_response(obitos: &[Obito], latin1: bool) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><S:Envelope xmlns:S="{SOAP_ENV_NS}"><S:Body><ns2:getObitosResponse xmlns:ns2="{SELO_NS}">"#
        )
        .as_bytes(),
    );
    for obito in obitos {
        out.extend_from_slice(format!(r#"<listaObitos Hjid="{}"><nome>"#, obito.hjid).as_bytes());
        let nome = escape(obito.nome.as_str());
        if latin1 {
            out.extend(nome.chars().map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?')));
        } else {
            out.extend_from_slice(nome.as_bytes());
        }
        out.extend_from_slice(
            format!(
                "</nome><dataObito>{}</dataObito><matricula>{}</matricula><cartorio>{}</cartorio></listaObitos>",
                escape(obito.data_obito.as_str()),
                escape(obito.matricula.as_str()),
                escape(obito.cartorio.as_str()),
            )
            .as_bytes(),
        );
    }
    out.extend_from_slice(b"</ns2:getObitosResponse></S:Body></S:Envelope>");
    out
}

fn fault(code: &str, reason: &str) -> Response {
    let body = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><S:Envelope xmlns:S="{SOAP_ENV_NS}"><S:Body><S:Fault><faultcode>{code}</faultcode><faultstring>{}</faultstring></S:Fault></S:Body></S:Envelope>"#,
        escape(reason)
    );
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(CONTENT_TYPE, "text/xml;charset=utf-8")],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obito(hjid: i64, nome: &str) -> Obito {
        Obito {
            hjid,
            nome: nome.to_string(),
            data_obito: "2018-06-04".to_string(),
            matricula: format!("0000{hjid}"),
            cartorio: "1º Ofício".to_string(),
        }
    }

    #[test]
    fn parses_request_fields() {
        let body = br#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:selo="http://www.tjsc.jus.br/selo"><soapenv:Header/><soapenv:Body><selo:getObitos><user>a&amp;b</user><pass>p</pass><data>2018-06-04</data></selo:getObitos></soapenv:Body></soapenv:Envelope>"#;
        let request = parse_get_obitos(body).unwrap();
        assert_eq!(
            request,
            GetObitos {
                user: "a&b".to_string(),
                pass: "p".to_string(),
                data: "2018-06-04".to_string(),
            }
        );
    }

    #[test]
    fn request_without_operation_is_rejected() {
        assert!(parse_get_obitos(b"<Envelope><Body/></Envelope>").is_err());
    }

    #[test]
    fn response_contains_one_entry_per_obito() {
        let body = render_response(&[obito(1, "Ana"), obito(2, "Rui")], false);
        let text = String::from_utf8(body).unwrap();
        assert_eq!(text.matches("<listaObitos ").count(), 2);
        assert!(text.contains(r#"<listaObitos Hjid="2"><nome>Rui</nome>"#));
    }

    #[test]
    fn latin1_mode_emits_invalid_utf8() {
        let body = render_response(&[obito(1, "José")], true);
        assert!(std::str::from_utf8(&body).is_err());
        assert!(body.windows(5).any(|w| w == b"Jos\xe9<"));
    }

    #[test]
    fn registry_groups_obitos_by_date() {
        let registry = Registry::new("u", "p")
            .with_obito("2018-06-04", obito(1, "Ana"))
            .with_obito("2018-06-04", obito(2, "Rui"))
            .with_obito("2018-06-05", obito(3, "Eva"));
        assert_eq!(registry.obitos["2018-06-04"].len(), 2);
        assert_eq!(registry.obitos["2018-06-05"].len(), 1);
    }
}
