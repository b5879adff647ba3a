//! OGC service exception detection.
//!
//! WMS endpoints report failures in-band: an XML ServiceExceptionReport
//! (1.1.1/1.3.0) or an OWS ExceptionReport body returned with a 200 status.
//! These are surfaced as typed errors instead of being parsed as payload.

use quick_xml::events::Event;
use quick_xml::Reader;

use harvest_common::HarvestError;

/// Check whether `xml` is a service exception report.
///
/// Returns the typed error when it is, `None` for ordinary payloads.
pub fn detect(xml: &str) -> Option<HarvestError> {
    let head = xml.get(..512).unwrap_or(xml);
    if !head.contains("ServiceExceptionReport") && !head.contains("ExceptionReport") {
        return None;
    }
    Some(parse_report(xml))
}

fn parse_report(xml: &str) -> HarvestError {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut code = String::new();
    let mut in_exception = false;
    let mut message = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"ServiceException" | b"Exception" => {
                    in_exception = true;
                    for attr in e.attributes().flatten() {
                        if matches!(attr.key.as_ref(), b"code" | b"exceptionCode") {
                            code = String::from_utf8_lossy(&attr.value).into_owned();
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Text(t)) if in_exception => {
                if let Ok(text) = t.unescape() {
                    if !message.is_empty() {
                        message.push(' ');
                    }
                    message.push_str(text.trim());
                }
            }
            Ok(Event::End(e))
                if matches!(e.local_name().as_ref(), b"ServiceException" | b"Exception") =>
            {
                // First exception entry wins; servers rarely report more.
                break;
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    if code.is_empty() {
        code = "NoApplicableCode".to_string();
    }

    HarvestError::ServiceException { code, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_111_report() {
        let xml = r#"<?xml version="1.0"?>
<ServiceExceptionReport version="1.1.1">
  <ServiceException code="LayerNotDefined">Layer 'x' is not advertised</ServiceException>
</ServiceExceptionReport>"#;

        match detect(xml) {
            Some(HarvestError::ServiceException { code, message }) => {
                assert_eq!(code, "LayerNotDefined");
                assert!(message.contains("not advertised"));
            }
            other => panic!("expected service exception, got {:?}", other),
        }
    }

    #[test]
    fn detects_ows_report() {
        let xml = r#"<ows:ExceptionReport xmlns:ows="http://www.opengis.net/ows/1.1">
  <ows:Exception exceptionCode="InvalidParameterValue">
    <ows:ExceptionText>BBOX out of range</ows:ExceptionText>
  </ows:Exception>
</ows:ExceptionReport>"#;

        match detect(xml) {
            Some(HarvestError::ServiceException { code, message }) => {
                assert_eq!(code, "InvalidParameterValue");
                assert_eq!(message, "BBOX out of range");
            }
            other => panic!("expected service exception, got {:?}", other),
        }
    }

    #[test]
    fn ordinary_payload_passes() {
        assert!(detect("<WMS_Capabilities version=\"1.3.0\"/>").is_none());
        assert!(detect("not xml at all").is_none());
    }

    #[test]
    fn missing_code_defaults() {
        let xml = "<ServiceExceptionReport><ServiceException>boom</ServiceException></ServiceExceptionReport>";
        match detect(xml) {
            Some(HarvestError::ServiceException { code, .. }) => {
                assert_eq!(code, "NoApplicableCode");
            }
            other => panic!("expected service exception, got {:?}", other),
        }
    }
}
