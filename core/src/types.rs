//! Domain types for death-certificate records.
//!
//! # Design
//! The certificate schema (`CObito`) belongs to the registry service, not to
//! this client, so records are kept schema-less: an ordered map from element
//! name to value. Leaf elements become `Text`, repeated siblings become
//! `List`, and elements with children or attributes become nested records.
//! Attributes are stored under `@name` keys and mixed-in text under `$text`,
//! which lets the XML exporter write back the same shape it was decoded from.

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Key prefix marking an XML attribute inside a record.
pub const ATTRIBUTE_PREFIX: char = '@';

/// Key holding character data that sits next to child elements.
pub const TEXT_KEY: &str = "$text";

/// One death certificate returned by `getObitos`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertificateRecord {
    fields: IndexMap<String, FieldValue>,
}

/// The value of a single record field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<FieldValue>),
    Record(CertificateRecord),
}

impl CertificateRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, folding repeated names into a `List` in arrival order.
    pub fn push(&mut self, name: impl Into<String>, value: FieldValue) {
        match self.fields.entry(name.into()) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                FieldValue::List(items) => items.push(value),
                existing => {
                    let first = std::mem::replace(existing, FieldValue::List(Vec::new()));
                    *existing = FieldValue::List(vec![first, value]);
                }
            },
        }
    }

    /// Builder-style `push`.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.push(name, value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Text of a leaf field, if the field exists and is a leaf.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(FieldValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl From<CertificateRecord> for FieldValue {
    fn from(record: CertificateRecord) -> Self {
        FieldValue::Record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_keeps_insertion_order() {
        let record = CertificateRecord::new()
            .with("nome", "Maria")
            .with("dataObito", "2018-06-04")
            .with("cartorio", "Ofício 1");
        let names: Vec<&str> = record.fields().map(|(name, _)| name).collect();
        assert_eq!(names, ["nome", "dataObito", "cartorio"]);
    }

    #[test]
    fn repeated_names_fold_into_list() {
        let record = CertificateRecord::new()
            .with("filho", "Ana")
            .with("filho", "Pedro")
            .with("filho", "Luiza");
        assert_eq!(record.len(), 1);
        assert_eq!(
            record.get("filho"),
            Some(&FieldValue::List(vec!["Ana".into(), "Pedro".into(), "Luiza".into()]))
        );
    }

    #[test]
    fn text_ignores_non_leaf_fields() {
        let record = CertificateRecord::new()
            .with("nome", "Maria")
            .with("endereco", CertificateRecord::new().with("cidade", "Joinville"));
        assert_eq!(record.text("nome"), Some("Maria"));
        assert_eq!(record.text("endereco"), None);
        assert_eq!(record.text("ausente"), None);
    }

    #[test]
    fn serializes_as_ordered_json_object() {
        let record = CertificateRecord::new()
            .with("zeta", "1")
            .with("alfa", "2")
            .with("lista", "a")
            .with("lista", "b");
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"zeta":"1","alfa":"2","lista":["a","b"]}"#);
    }

    #[test]
    fn deserializes_nested_json() {
        let record: CertificateRecord =
            serde_json::from_str(r#"{"nome":"Maria","pais":{"mae":"Ana"},"filhos":["Rui","Eva"]}"#)
                .unwrap();
        assert_eq!(record.text("nome"), Some("Maria"));
        assert_eq!(
            record.get("pais"),
            Some(&FieldValue::Record(CertificateRecord::new().with("mae", "Ana")))
        );
        assert_eq!(
            record.get("filhos"),
            Some(&FieldValue::List(vec!["Rui".into(), "Eva".into()]))
        );
    }
}
