//! XML documents for the phone control protocol.
//!
//! Requests are posted to a phone's execute endpoint as a form field; the
//! phone answers with a small XML document whose root element decides the
//! outcome. Start and stop use different acknowledgment roots and different
//! error shapes, which is a quirk of the protocol, not of this crate.

use roxmltree::Document;

/// The control action a document was sent for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Start,
    Stop,
}

/// A classified control response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The phone acknowledged the action.
    Ack,
    /// `<errorResponse>` with `type`/`data` child text.
    ErrorReport { kind: String, data: String },
    /// `<CiscoIPPhoneError Number="..."/>`, only reported for stop.
    ErrorCode { number: String },
    /// A well-formed document with a root this action does not expect.
    Unexpected { root: String },
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ParseError(#[from] roxmltree::Error);

/// Build a `startMedia` request telling the phone to receive an RTP stream.
///
/// `codec` is the protocol-level codec name (`G.711`/`G.722`), `address` the
/// shared source or multicast address every target gets.
pub fn start_media(address: &str, port: u16, codec: &str, volume: Option<u8>) -> String {
    let mut doc = String::from("<startMedia><mediaStream");
    if let Some(volume) = volume {
        doc.push_str(&format!(" receiveVolume=\"{volume}\""));
    }
    doc.push('>');
    doc.push_str("<type>audio</type>");
    doc.push_str(&format!("<codec>{}</codec>", escape(codec)));
    doc.push_str("<mode>receive</mode>");
    doc.push_str(&format!("<address>{}</address>", escape(address)));
    doc.push_str(&format!("<port>{port}</port>"));
    doc.push_str("</mediaStream></startMedia>");
    doc
}

/// Build a `stopMedia` request.
pub fn stop_media() -> String {
    "<stopMedia><mediaStream/></stopMedia>".to_owned()
}

/// Classify a response body for the given action.
///
/// Start expects a `mediaStream` acknowledgment; stop is acknowledged by the
/// absence of an error root.
pub fn classify(action: Action, body: &str) -> Result<Reply, ParseError> {
    let doc = Document::parse(body)?;
    let root = doc.root_element();
    let name = root.tag_name().name();

    if name == "errorResponse" {
        return Ok(Reply::ErrorReport {
            kind: child_text(root, "type").unwrap_or_default(),
            data: child_text(root, "data").unwrap_or_default(),
        });
    }

    Ok(match action {
        Action::Start => {
            if name == "mediaStream" {
                Reply::Ack
            } else {
                Reply::Unexpected {
                    root: name.to_owned(),
                }
            }
        }
        Action::Stop => {
            if name == "CiscoIPPhoneError" {
                Reply::ErrorCode {
                    number: root.attribute("Number").unwrap_or_default().to_owned(),
                }
            } else {
                Reply::Ack
            }
        }
    })
}

fn child_text(node: roxmltree::Node, name: &str) -> Option<String> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .and_then(|n| n.text())
        .map(|t| t.trim().to_owned())
}

/// Escape text for use in element content or an attribute value.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    use super::*;

    #[test]
    fn start_media_with_volume() {
        assert_eq!(
            start_media("239.0.1.2", 20480, "G.711", Some(50)),
            "<startMedia><mediaStream receiveVolume=\"50\">\
             <type>audio</type><codec>G.711</codec><mode>receive</mode>\
             <address>239.0.1.2</address><port>20480</port>\
             </mediaStream></startMedia>"
        );
    }

    #[test]
    fn start_media_without_volume() {
        let doc = start_media("10.1.2.3", 16384, "G.722", None);
        assert!(!doc.contains("receiveVolume"));
        assert!(doc.contains("<codec>G.722</codec>"));
        assert!(doc.contains("<address>10.1.2.3</address>"));
        assert!(doc.contains("<port>16384</port>"));
    }

    #[test]
    fn stop_media_document() {
        assert_eq!(stop_media(), "<stopMedia><mediaStream/></stopMedia>");
    }

    #[test]
    fn start_ack() {
        assert_eq!(classify(Action::Start, "<mediaStream/>").unwrap(), Reply::Ack);
    }

    #[test]
    fn start_error_report() {
        let body = "<errorResponse><type>AuthFailed</type><data>4</data></errorResponse>";
        assert_eq!(
            classify(Action::Start, body).unwrap(),
            Reply::ErrorReport {
                kind: "AuthFailed".to_owned(),
                data: "4".to_owned(),
            }
        );
    }

    #[test]
    fn start_error_report_missing_fields() {
        assert_eq!(
            classify(Action::Start, "<errorResponse/>").unwrap(),
            Reply::ErrorReport {
                kind: String::new(),
                data: String::new(),
            }
        );
    }

    #[test]
    fn start_unexpected_root() {
        assert_eq!(
            classify(Action::Start, "<CiscoIPPhoneText/>").unwrap(),
            Reply::Unexpected {
                root: "CiscoIPPhoneText".to_owned(),
            }
        );
    }

    #[test]
    fn stop_ack_is_absence_of_error() {
        assert_eq!(classify(Action::Stop, "<stopMedia/>").unwrap(), Reply::Ack);
        assert_eq!(classify(Action::Stop, "<mediaStream/>").unwrap(), Reply::Ack);
    }

    #[test]
    fn stop_error_code() {
        assert_eq!(
            classify(Action::Stop, "<CiscoIPPhoneError Number=\"6\"/>").unwrap(),
            Reply::ErrorCode {
                number: "6".to_owned(),
            }
        );
    }

    #[test]
    fn stop_error_report() {
        let body = "<errorResponse><type>Busy</type><data></data></errorResponse>";
        assert_eq!(
            classify(Action::Stop, body).unwrap(),
            Reply::ErrorReport {
                kind: "Busy".to_owned(),
                data: String::new(),
            }
        );
    }

    #[test]
    fn malformed_body() {
        assert!(classify(Action::Start, "not xml at all").is_err());
        assert!(classify(Action::Stop, "<unterminated").is_err());
    }

    // Tab/newline are excluded too: attribute-value normalization would
    // rewrite them to spaces and the comparison below is exact.
    fn plain_xml_char(ch: char) -> bool {
        ('\u{20}'..='\u{D7FF}').contains(&ch)
            || ('\u{E000}'..='\u{FFFD}').contains(&ch)
            || ('\u{10000}'..='\u{10FFFF}').contains(&ch)
    }

    #[quickcheck]
    fn escaped_text_survives_a_parse(s: String) -> TestResult {
        if !s.chars().all(plain_xml_char) {
            return TestResult::discard();
        }

        let doc = format!("<t a=\"{}\">{}</t>", escape(&s), escape(&s));
        let parsed = Document::parse(&doc).unwrap();
        let root = parsed.root_element();

        TestResult::from_bool(
            root.attribute("a") == Some(s.as_str())
                && root.text().unwrap_or_default() == s,
        )
    }
}
