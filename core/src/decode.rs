//! Decoding of the `getObitosResponse` SOAP envelope.
//!
//! # Design
//! The response is walked with a namespace-aware pull parser instead of a
//! typed serde model because the record schema is not ours: the envelope,
//! body and response wrappers are matched by name, while everything inside a
//! `listaObitos` entry is captured generically into a `CertificateRecord`.
//!
//! The output has exactly one record per `listaObitos` entry, in document
//! order.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

use crate::envelope::SOAP_ENV_NS;
use crate::error::ApiError;
use crate::types::{CertificateRecord, FieldValue, ATTRIBUTE_PREFIX, TEXT_KEY};

/// SOAP 1.2 envelope namespace, accepted alongside 1.1.
pub const SOAP12_ENV_NS: &str = "http://www.w3.org/2003/05/soap-envelope";

const RESPONSE_ELEMENT: &[u8] = b"getObitosResponse";
const ENTRY_ELEMENT: &[u8] = b"listaObitos";
const ENTRY_ID_ATTRIBUTE: &str = "Hjid";

/// A decoded `getObitosResponse`. Only lives for the duration of a decode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub entries: Vec<ResponseEntry>,
}

/// One `listaObitos` element: the record plus its optional `Hjid` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEntry {
    pub hjid: Option<i64>,
    pub record: CertificateRecord,
}

impl ResponseEnvelope {
    pub fn into_records(self) -> Vec<CertificateRecord> {
        self.entries.into_iter().map(|entry| entry.record).collect()
    }
}

/// Decode a sanitized response body.
pub fn decode_response(xml: &str) -> Result<ResponseEnvelope, ApiError> {
    let mut reader = NsReader::from_str(xml);

    let root = root_element(&mut reader)?;
    let (namespace, local) = reader.resolve_element(root.name());
    if local.as_ref() != b"Envelope" || !is_soap_namespace(&namespace) {
        return Err(malformed(format!(
            "root element is {:?}, expected a SOAP Envelope",
            String::from_utf8_lossy(root.name().as_ref())
        )));
    }

    let mut body = None;
    while let Some((child, empty)) = next_child(&mut reader)? {
        if child.local_name().as_ref() == b"Body" && !empty {
            body = Some(decode_body(&mut reader)?);
        } else if !empty {
            skip(&mut reader, &child)?;
        }
    }
    body.ok_or_else(|| malformed("envelope has no Body"))
}

fn decode_body(reader: &mut NsReader<&[u8]>) -> Result<ResponseEnvelope, ApiError> {
    let mut response = None;
    while let Some((child, empty)) = next_child(reader)? {
        match child.local_name().as_ref() {
            RESPONSE_ELEMENT if empty => response = Some(ResponseEnvelope::default()),
            RESPONSE_ELEMENT => response = Some(decode_entries(reader)?),
            b"Fault" => {
                let fault = if empty {
                    CertificateRecord::new()
                } else {
                    read_record(reader, &child)?
                };
                let reason = fault
                    .text("faultstring")
                    .or_else(|| fault.text("Reason"))
                    .unwrap_or("no fault string");
                return Err(malformed(format!("service returned a SOAP fault: {reason}")));
            }
            _ if empty => {}
            _ => skip(reader, &child)?,
        }
    }
    response.ok_or_else(|| malformed("Body has no getObitosResponse"))
}

fn decode_entries(reader: &mut NsReader<&[u8]>) -> Result<ResponseEnvelope, ApiError> {
    let mut envelope = ResponseEnvelope::default();
    while let Some((child, empty)) = next_child(reader)? {
        if child.local_name().as_ref() != ENTRY_ELEMENT {
            if !empty {
                skip(reader, &child)?;
            }
            continue;
        }

        let mut hjid = None;
        let mut record = CertificateRecord::new();
        for (name, value) in attributes(&child)? {
            if name == ENTRY_ID_ATTRIBUTE {
                hjid = parse_hjid(&value)?;
            } else {
                record.push(format!("{ATTRIBUTE_PREFIX}{name}"), FieldValue::Text(value));
            }
        }
        if !empty {
            read_content(reader, &mut record, false)?;
        }
        envelope.entries.push(ResponseEntry { hjid, record });
    }
    Ok(envelope)
}

/// An empty `Hjid` means no id; anything else must be an integer.
fn parse_hjid(value: &str) -> Result<Option<i64>, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<i64>()
        .map(Some)
        .map_err(|e| malformed(format!("invalid Hjid {value:?}: {e}")))
}

/// Read the element opened by `start` (a `Start` event) into a record.
///
/// Whitespace-only text directly under the element is dropped.
pub(crate) fn read_record(
    reader: &mut NsReader<&[u8]>,
    start: &BytesStart<'_>,
) -> Result<CertificateRecord, ApiError> {
    let mut record = attribute_record(attributes(start)?);
    read_content(reader, &mut record, false)?;
    Ok(record)
}

/// Read child elements and text up to the closing tag of the current element.
///
/// Once the element has child elements, whitespace-only text runs between
/// them are indentation and are dropped.
fn read_content(
    reader: &mut NsReader<&[u8]>,
    record: &mut CertificateRecord,
    keep_blank: bool,
) -> Result<(), ApiError> {
    let mut runs: Vec<String> = Vec::new();
    let mut has_children = false;
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => {
                has_children = true;
                let name = local_name(&e)?;
                let value = read_value(reader, &e)?;
                record.push(name, value);
            }
            Event::Empty(e) => {
                has_children = true;
                let name = local_name(&e)?;
                let attrs = attributes(&e)?;
                let value = if attrs.is_empty() {
                    FieldValue::Text(String::new())
                } else {
                    FieldValue::Record(attribute_record(attrs))
                };
                record.push(name, value);
            }
            Event::Text(t) => runs.push(t.unescape().map_err(malformed)?.into_owned()),
            Event::CData(c) => runs.push(String::from_utf8_lossy(&c.into_inner()).into_owned()),
            Event::End(_) => break,
            Event::Eof => return Err(malformed("unexpected end of document")),
            _ => {}
        }
    }
    let text: String = if has_children {
        runs.iter()
            .filter(|run| !run.trim().is_empty())
            .map(String::as_str)
            .collect()
    } else {
        runs.concat()
    };
    let leaf = record.is_empty() && keep_blank && !text.is_empty();
    if leaf || !text.trim().is_empty() {
        record.push(TEXT_KEY, FieldValue::Text(text));
    }
    Ok(())
}

/// Read a field element: a leaf becomes `Text`, anything else a nested record.
fn read_value(reader: &mut NsReader<&[u8]>, start: &BytesStart<'_>) -> Result<FieldValue, ApiError> {
    let mut record = attribute_record(attributes(start)?);
    read_content(reader, &mut record, true)?;
    if record.is_empty() {
        return Ok(FieldValue::Text(String::new()));
    }
    if record.len() == 1 {
        if let Some(text) = record.text(TEXT_KEY) {
            return Ok(FieldValue::Text(text.to_string()));
        }
    }
    Ok(FieldValue::Record(record))
}

pub(crate) fn attribute_record(attrs: Vec<(String, String)>) -> CertificateRecord {
    let mut record = CertificateRecord::new();
    for (name, value) in attrs {
        record.push(format!("{ATTRIBUTE_PREFIX}{name}"), FieldValue::Text(value));
    }
    record
}

/// Non-namespace attributes of `start`, keyed by local name.
pub(crate) fn attributes(start: &BytesStart<'_>) -> Result<Vec<(String, String)>, ApiError> {
    let mut out = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(malformed)?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let name = std::str::from_utf8(attr.key.local_name().as_ref())
            .map_err(malformed)?
            .to_string();
        let value = attr.unescape_value().map_err(malformed)?.into_owned();
        out.push((name, value));
    }
    Ok(out)
}

fn local_name(start: &BytesStart<'_>) -> Result<String, ApiError> {
    std::str::from_utf8(start.local_name().as_ref())
        .map(str::to_string)
        .map_err(malformed)
}

/// Advance past the prolog to the root start tag.
pub(crate) fn root_element<'i>(reader: &mut NsReader<&'i [u8]>) -> Result<BytesStart<'i>, ApiError> {
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => return Ok(e),
            Event::Empty(e) => {
                return Err(malformed(format!(
                    "root element {:?} is empty",
                    String::from_utf8_lossy(e.name().as_ref())
                )))
            }
            Event::Text(t) if !t.iter().all(u8::is_ascii_whitespace) => {
                return Err(malformed("text outside the root element"))
            }
            Event::Eof => return Err(malformed("document has no root element")),
            _ => {}
        }
    }
}

/// Next child of the current element and whether it is self-closing, or
/// `None` once the current element's end tag is reached.
pub(crate) fn next_child<'i>(
    reader: &mut NsReader<&'i [u8]>,
) -> Result<Option<(BytesStart<'i>, bool)>, ApiError> {
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => return Ok(Some((e, false))),
            Event::Empty(e) => return Ok(Some((e, true))),
            Event::End(_) => return Ok(None),
            Event::Eof => return Err(malformed("unexpected end of document")),
            _ => {}
        }
    }
}

fn skip(reader: &mut NsReader<&[u8]>, start: &BytesStart<'_>) -> Result<(), ApiError> {
    reader.read_to_end(start.name()).map(|_| ()).map_err(malformed)
}

fn is_soap_namespace(namespace: &ResolveResult<'_>) -> bool {
    matches!(
        namespace,
        ResolveResult::Bound(Namespace(ns))
            if *ns == SOAP_ENV_NS.as_bytes() || *ns == SOAP12_ENV_NS.as_bytes()
    )
}

pub(crate) fn malformed(reason: impl std::fmt::Display) -> ApiError {
    ApiError::Decode(reason.to_string())
}
