//! Line codec for the HQPlayer control protocol.
//!
//! Wire format: one XML document per line, UTF-8, terminated by `\n`.
//!
//! ```text
//! → <?xml version="1.0" encoding="UTF-8"?><VolumeRange/>
//! ← <?xml version="1.0" encoding="UTF-8"?><VolumeRange min="-60" max="0" enabled="1" adaptive="0"/>
//! → <?xml version="1.0" encoding="UTF-8"?><Volume value="-20"/>
//! ```
//!
//! Framing is therefore trivial (split on newlines); this module only turns
//! typed requests into lines and lines into typed responses.

use thiserror::Error;

use crate::protocol::messages::{ControlRequest, ControlResponse, PlaybackState, VolumeRange};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Errors that can occur while decoding a response line.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The line contained only whitespace.
    #[error("empty response line")]
    Empty,

    /// The line is not a well-formed XML document.
    #[error("malformed XML: {0}")]
    MalformedXml(String),

    /// A known element is missing an attribute the daemon relies on.
    #[error("<{element}> is missing attribute '{attribute}'")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    /// A numeric attribute could not be parsed as a decimal number.
    #[error("attribute '{attribute}' has non-numeric value '{value}'")]
    InvalidNumber {
        attribute: &'static str,
        value: String,
    },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a request as one newline-terminated line.
///
/// # Examples
///
/// ```rust
/// use usbvol_core::protocol::{encode_request, ControlRequest};
///
/// let line = encode_request(&ControlRequest::Volume(-20.5));
/// assert!(line.ends_with("<Volume value=\"-20.5\"/>\n"));
/// ```
pub fn encode_request(request: &ControlRequest) -> String {
    let body = match request {
        ControlRequest::VolumeRange => "<VolumeRange/>".to_string(),
        ControlRequest::State => "<State/>".to_string(),
        ControlRequest::Volume(db) => format!(r#"<Volume value="{db}"/>"#),
    };
    format!("{XML_DECLARATION}{body}\n")
}

/// Decodes one response line (with or without its trailing newline).
///
/// # Errors
///
/// Returns [`ProtocolError`] if the line is empty, is not XML, or is a
/// `VolumeRange`/`State` document missing a required numeric attribute.
///
/// # Examples
///
/// ```rust
/// use usbvol_core::protocol::{decode_response, ControlResponse};
///
/// let resp = decode_response(r#"<VolumeRange min="-60" max="0" enabled="1" adaptive="0"/>"#).unwrap();
/// assert!(matches!(resp, ControlResponse::VolumeRange(r) if r.min == -60.0));
/// ```
pub fn decode_response(line: &str) -> Result<ControlResponse, ProtocolError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ProtocolError::Empty);
    }

    let doc =
        roxmltree::Document::parse(line).map_err(|e| ProtocolError::MalformedXml(e.to_string()))?;
    let root = doc.root_element();

    match root.tag_name().name() {
        "VolumeRange" => Ok(ControlResponse::VolumeRange(VolumeRange {
            min: number(root, "VolumeRange", "min")?,
            max: number(root, "VolumeRange", "max")?,
            enabled: flag(root.attribute("enabled")),
            adaptive: flag(root.attribute("adaptive")),
        })),
        "State" => Ok(ControlResponse::State(PlaybackState {
            volume: number(root, "State", "volume")?,
            attributes: root
                .attributes()
                .filter(|attr| attr.name() != "volume")
                .map(|attr| (attr.name().to_string(), attr.value().to_string()))
                .collect(),
        })),
        other => Ok(ControlResponse::Other(other.to_string())),
    }
}

// ── Attribute helpers ─────────────────────────────────────────────────────────

fn number(
    node: roxmltree::Node<'_, '_>,
    element: &'static str,
    attribute: &'static str,
) -> Result<f64, ProtocolError> {
    let raw = node
        .attribute(attribute)
        .ok_or(ProtocolError::MissingAttribute { element, attribute })?;
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ProtocolError::InvalidNumber {
            attribute,
            value: raw.to_string(),
        })
}

fn flag(raw: Option<&str>) -> bool {
    matches!(raw.map(str::trim), Some("1") | Some("true"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Encoding ──────────────────────────────────────────────────────────────

    #[test]
    fn test_encode_volume_range_request() {
        assert_eq!(
            encode_request(&ControlRequest::VolumeRange),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><VolumeRange/>\n"
        );
    }

    #[test]
    fn test_encode_state_request() {
        assert!(encode_request(&ControlRequest::State).ends_with("<State/>\n"));
    }

    #[test]
    fn test_encode_volume_uses_shortest_decimal() {
        assert!(encode_request(&ControlRequest::Volume(-20.0)).ends_with("<Volume value=\"-20\"/>\n"));
        assert!(encode_request(&ControlRequest::Volume(-3.5)).contains(r#"value="-3.5""#));
    }

    #[test]
    fn test_encoded_request_is_single_line() {
        let line = encode_request(&ControlRequest::Volume(-1.0));
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.ends_with('\n'));
    }

    // ── Decoding ──────────────────────────────────────────────────────────────

    #[test]
    fn test_decode_volume_range_with_declaration() {
        // Arrange
        let line = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
                    <VolumeRange min=\"-60.0\" max=\"0.0\" enabled=\"1\" adaptive=\"0\"/>\n";

        // Act
        let resp = decode_response(line).unwrap();

        // Assert
        assert_eq!(
            resp,
            ControlResponse::VolumeRange(VolumeRange {
                min: -60.0,
                max: 0.0,
                enabled: true,
                adaptive: false,
            })
        );
    }

    #[test]
    fn test_decode_state_keeps_volume_and_opaque_attributes() {
        // Arrange: a State document as sent by HQPlayer Embedded
        let line = r#"<?xml version="1.0" encoding="UTF-8"?><State state="2" mode="0" filter="12" filter1x="12" filterNx="30" shaper="4" rate="705600" volume="-23.5" active_mode="1" active_rate="705600" invert="0" convolution="0" repeat="0" random="0" adaptive="0" filter_20k="0" matrix_profile=""/>"#;

        // Act
        let resp = decode_response(line).unwrap();

        // Assert
        let ControlResponse::State(state) = resp else {
            panic!("expected State");
        };
        assert_eq!(state.volume, -23.5);
        assert_eq!(state.attribute("rate"), Some("705600"));
        assert_eq!(state.attribute("matrix_profile"), Some(""));
        assert_eq!(state.attribute("volume"), None);
        assert_eq!(state.attributes.first().map(|(k, _)| k.as_str()), Some("state"));
    }

    #[test]
    fn test_decode_unknown_element_returns_other() {
        let resp = decode_response(r#"<Volume result="OK"/>"#).unwrap();
        assert_eq!(resp, ControlResponse::Other("Volume".to_string()));
    }

    #[test]
    fn test_decode_missing_flags_default_to_false() {
        let resp = decode_response(r#"<VolumeRange min="-90" max="-3"/>"#).unwrap();
        let ControlResponse::VolumeRange(range) = resp else {
            panic!("expected VolumeRange");
        };
        assert!(!range.enabled);
        assert!(!range.adaptive);
    }

    #[test]
    fn test_decode_empty_line_is_error() {
        assert_eq!(decode_response("  \r\n"), Err(ProtocolError::Empty));
    }

    #[test]
    fn test_decode_garbage_is_malformed_xml() {
        assert!(matches!(
            decode_response("<VolumeRange min="),
            Err(ProtocolError::MalformedXml(_))
        ));
    }

    #[test]
    fn test_decode_state_without_volume_is_missing_attribute() {
        assert_eq!(
            decode_response(r#"<State state="0"/>"#),
            Err(ProtocolError::MissingAttribute {
                element: "State",
                attribute: "volume",
            })
        );
    }

    #[test]
    fn test_decode_non_numeric_range_is_invalid_number() {
        assert_eq!(
            decode_response(r#"<VolumeRange min="loud" max="0"/>"#),
            Err(ProtocolError::InvalidNumber {
                attribute: "min",
                value: "loud".to_string(),
            })
        );
    }

    #[test]
    fn test_decode_non_finite_volume_is_rejected() {
        assert!(matches!(
            decode_response(r#"<State volume="NaN"/>"#),
            Err(ProtocolError::InvalidNumber { attribute: "volume", .. })
        ));
    }
}
