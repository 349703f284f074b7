//! JSON and XML export of decoded certificates.
//!
//! # Design
//! Both exporters take a path *stem* and append their own extension, so one
//! `--output certificates` flag yields `certificates.json` and
//! `certificates.xml`. Files are truncated and rewritten in place; a crash
//! mid-write can leave a partial file behind.
//!
//! The XML layout is a root `<obitos>` element with one `<CObito>` per
//! record. Fields map back to child elements, `List` values to repeated
//! siblings and `@`-prefixed keys to attributes, mirroring how the decoder
//! captured them.

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{NsReader, Writer};

use crate::decode::{attribute_record, attributes, malformed, next_child, read_record, root_element};
use crate::error::ApiError;
use crate::types::{CertificateRecord, FieldValue, ATTRIBUTE_PREFIX, TEXT_KEY};

const XML_ROOT: &str = "obitos";
const XML_RECORD: &str = "CObito";

/// Write `records` as indented JSON to `<stem>.json`. Returns the path written.
pub fn export_json(records: &[CertificateRecord], stem: &Path) -> Result<PathBuf, ApiError> {
    let data = records_to_json(records)?;
    let path = with_extension(stem, "json");
    write_file(&path, &data)?;
    Ok(path)
}

/// Write `records` as indented XML to `<stem>.xml`. Returns the path written.
pub fn export_xml(records: &[CertificateRecord], stem: &Path) -> Result<PathBuf, ApiError> {
    let data = records_to_xml(records)?;
    let path = with_extension(stem, "xml");
    write_file(&path, &data)?;
    Ok(path)
}

pub fn records_to_json(records: &[CertificateRecord]) -> Result<Vec<u8>, ApiError> {
    serde_json::to_vec_pretty(records).map_err(|e| ApiError::Serialization(e.to_string()))
}

pub fn records_from_json(data: &[u8]) -> Result<Vec<CertificateRecord>, ApiError> {
    serde_json::from_slice(data).map_err(|e| ApiError::Decode(e.to_string()))
}

pub fn records_to_xml(records: &[CertificateRecord]) -> Result<Vec<u8>, ApiError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    if records.is_empty() {
        emit(&mut writer, Event::Empty(BytesStart::new(XML_ROOT)))?;
    } else {
        emit(&mut writer, Event::Start(BytesStart::new(XML_ROOT)))?;
        for record in records {
            write_record(&mut writer, XML_RECORD, record)?;
        }
        emit(&mut writer, Event::End(BytesEnd::new(XML_ROOT)))?;
    }
    let mut data = writer.into_inner();
    data.push(b'\n');
    Ok(data)
}

/// Parse a document produced by `records_to_xml`.
pub fn records_from_xml(data: &[u8]) -> Result<Vec<CertificateRecord>, ApiError> {
    let text = std::str::from_utf8(data).map_err(malformed)?;
    let mut reader = NsReader::from_str(text);
    let mut records = Vec::new();
    let root = match root_element(&mut reader) {
        Ok(root) => root,
        // `<obitos/>` is how an empty export looks.
        Err(_) if is_empty_root(text) => return Ok(records),
        Err(e) => return Err(e),
    };
    if root.local_name().as_ref() != XML_ROOT.as_bytes() {
        return Err(malformed(format!(
            "root element is {:?}, expected {XML_ROOT:?}",
            String::from_utf8_lossy(root.name().as_ref())
        )));
    }
    while let Some((child, empty)) = next_child(&mut reader)? {
        let record = if empty {
            attribute_record(attributes(&child)?)
        } else {
            read_record(&mut reader, &child)?
        };
        records.push(record);
    }
    Ok(records)
}

fn is_empty_root(text: &str) -> bool {
    let mut reader = NsReader::from_str(text);
    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) => return e.local_name().as_ref() == XML_ROOT.as_bytes(),
            Ok(Event::Decl(_)) | Ok(Event::Comment(_)) | Ok(Event::Text(_)) => {}
            _ => return false,
        }
    }
}

fn write_record(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    record: &CertificateRecord,
) -> Result<(), ApiError> {
    let mut start = BytesStart::new(check_name(name)?);
    let mut text = None;
    let mut children = Vec::new();
    for (key, value) in record.fields() {
        if let Some(attr) = key.strip_prefix(ATTRIBUTE_PREFIX) {
            let FieldValue::Text(value) = value else {
                return Err(ApiError::Serialization(format!(
                    "attribute {key:?} must hold text"
                )));
            };
            start.push_attribute((check_name(attr)?, value.as_str()));
        } else if key == TEXT_KEY {
            if let FieldValue::Text(value) = value {
                text = Some(value.as_str());
            }
        } else {
            children.push((key, value));
        }
    }

    if children.is_empty() && text.is_none() {
        return emit(writer, Event::Empty(start));
    }
    emit(writer, Event::Start(start))?;
    if let Some(text) = text {
        emit(writer, Event::Text(BytesText::new(text)))?;
    }
    for (key, value) in children {
        write_field(writer, key, value)?;
    }
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn write_field(writer: &mut Writer<Vec<u8>>, name: &str, value: &FieldValue) -> Result<(), ApiError> {
    match value {
        FieldValue::Text(text) => {
            let name = check_name(name)?;
            emit(writer, Event::Start(BytesStart::new(name)))?;
            emit(writer, Event::Text(BytesText::new(text)))?;
            emit(writer, Event::End(BytesEnd::new(name)))
        }
        FieldValue::List(items) => items
            .iter()
            .try_for_each(|item| write_field(writer, name, item)),
        FieldValue::Record(record) => write_record(writer, name, record),
    }
}

/// Reject keys that cannot be used as XML element or attribute names.
fn check_name(name: &str) -> Result<&str, ApiError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        }
        _ => false,
    };
    if valid && !name.to_ascii_lowercase().starts_with("xml") {
        Ok(name)
    } else {
        Err(ApiError::Serialization(format!(
            "{name:?} is not a valid XML name"
        )))
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), ApiError> {
    writer
        .write_event(event)
        .map_err(|e| ApiError::Serialization(e.to_string()))
}

fn with_extension(stem: &Path, extension: &str) -> PathBuf {
    let mut path = OsString::from(stem.as_os_str());
    path.push(".");
    path.push(extension);
    PathBuf::from(path)
}

fn write_file(path: &Path, data: &[u8]) -> Result<(), ApiError> {
    let to_write_error = |source| ApiError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = create(path).map_err(to_write_error)?;
    file.write_all(data).map_err(to_write_error)?;
    file.sync_all().map_err(to_write_error)
}

#[cfg(unix)]
fn create(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o644)
        .open(path)
}

#[cfg(not(unix))]
fn create(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
