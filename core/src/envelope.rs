//! SOAP request envelope for the `getObitos` operation.
//!
//! # Design
//! The envelope shape is fixed; only `user`, `pass` and `data` vary. It is
//! emitted through `quick_xml::Writer` rather than string substitution so
//! that markup characters in credentials are escaped and the document stays
//! well-formed whatever the caller passes in.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::ApiError;

/// SOAP 1.1 envelope namespace.
pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Namespace of the registry's certificate service.
pub const SELO_NS: &str = "http://www.tjsc.jus.br/selo";

/// Render the `getObitos` request for `date` (expected as `YYYY-MM-DD`).
///
/// The date is passed through as given; the service is the one that rejects
/// malformed dates.
pub fn render_get_obitos(username: &str, password: &str, date: &str) -> Result<Vec<u8>, ApiError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    let envelope = BytesStart::new("soapenv:Envelope").with_attributes([
        ("xmlns:soapenv", SOAP_ENV_NS),
        // The service has always been sent this attribute; keep the wire
        // format byte-compatible with what it accepts.
        ("encoding", "UTF-16"),
        ("xmlns:selo", SELO_NS),
    ]);
    write(&mut writer, Event::Start(envelope))?;
    write(&mut writer, Event::Empty(BytesStart::new("soapenv:Header")))?;
    write(&mut writer, Event::Start(BytesStart::new("soapenv:Body")))?;
    write(&mut writer, Event::Start(BytesStart::new("selo:getObitos")))?;
    text_element(&mut writer, "user", username)?;
    text_element(&mut writer, "pass", password)?;
    text_element(&mut writer, "data", date)?;
    write(&mut writer, Event::End(BytesEnd::new("selo:getObitos")))?;
    write(&mut writer, Event::End(BytesEnd::new("soapenv:Body")))?;
    write(&mut writer, Event::End(BytesEnd::new("soapenv:Envelope")))?;

    Ok(writer.into_inner())
}

fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<(), ApiError> {
    write(writer, Event::Start(BytesStart::new(name)))?;
    write(writer, Event::Text(BytesText::new(text)))?;
    write(writer, Event::End(BytesEnd::new(name)))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), ApiError> {
    writer
        .write_event(event)
        .map_err(|e| ApiError::Template(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::Reader;

    /// Collect the unescaped text of every `<name>` element in `xml`.
    fn texts_of(xml: &[u8], name: &str) -> Vec<String> {
        let mut reader = Reader::from_reader(xml);
        let mut buf = Vec::new();
        let mut inside = false;
        let mut found = Vec::new();
        loop {
            match reader.read_event_into(&mut buf).unwrap() {
                Event::Start(e) if e.local_name().as_ref() == name.as_bytes() => inside = true,
                Event::End(e) if e.local_name().as_ref() == name.as_bytes() => inside = false,
                Event::Text(t) if inside => found.push(t.unescape().unwrap().into_owned()),
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        found
    }

    #[test]
    fn renders_operation_with_credentials_and_date() {
        let xml = render_get_obitos("convenio_cge", "myp1y2MOds", "2018-06-04").unwrap();
        let text = String::from_utf8(xml.clone()).unwrap();
        assert!(text.starts_with("<soapenv:Envelope"));
        assert!(text.contains(r#"xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/""#));
        assert!(text.contains(r#"xmlns:selo="http://www.tjsc.jus.br/selo""#));
        assert!(text.contains("<soapenv:Header/>"));
        assert!(text.contains("<selo:getObitos>"));
        assert_eq!(texts_of(&xml, "user"), ["convenio_cge"]);
        assert_eq!(texts_of(&xml, "pass"), ["myp1y2MOds"]);
        assert_eq!(texts_of(&xml, "data"), ["2018-06-04"]);
    }

    #[test]
    fn markup_in_values_is_escaped() {
        let password = r#"a<b>&c"d'e</pass><evil/>"#;
        let xml = render_get_obitos("us&er", password, "2018-06-04]]>").unwrap();
        let text = String::from_utf8(xml.clone()).unwrap();
        assert!(!text.contains("<evil/>"));
        assert!(text.contains("us&amp;er"));
        assert_eq!(texts_of(&xml, "user"), ["us&er"]);
        assert_eq!(texts_of(&xml, "pass"), [password]);
        assert_eq!(texts_of(&xml, "data"), ["2018-06-04]]>"]);
    }

    #[test]
    fn escaped_envelope_is_well_formed() {
        let xml = render_get_obitos("<", ">", "&").unwrap();
        let mut reader = Reader::from_reader(xml.as_slice());
        reader.config_mut().check_end_names = true;
        let mut buf = Vec::new();
        let mut depth = 0i32;
        loop {
            match reader.read_event_into(&mut buf).unwrap() {
                Event::Start(_) => depth += 1,
                Event::End(_) => depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        assert_eq!(depth, 0);
    }

    #[test]
    fn empty_values_render_empty_elements() {
        let xml = render_get_obitos("", "", "").unwrap();
        let text = String::from_utf8(xml).unwrap();
        assert!(text.contains("<user></user>"));
        assert!(text.contains("<data></data>"));
    }
}
