//! Decoding of the XML-wrapped JSON responses.
//!
//! A response looks like:
//!
//! ```text
//! <?xml version="1.0" encoding="utf-8"?>
//! <string xmlns="http://tempuri.org/">{"Code":"1","Message":"","result":[...]}</string>
//! ```
//!
//! [`unwrap_envelope`] extracts the text content of the root element and
//! [`decode_response`] turns that text into typed records.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::TelemetryError;

/// `Code` value the service uses to signal success.
pub const SUCCESS_CODE: &str = "1";

/// Maximum length of the body preview included in protocol errors.
const BODY_PREVIEW_LEN: usize = 200;

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(rename = "Code")]
    code: serde_json::Value,
    #[serde(rename = "Message", default)]
    message: serde_json::Value,
    #[serde(rename = "result", alias = "Result", default)]
    result: serde_json::Value,
}

/// Decodes a raw response body into the records carried in `result`.
///
/// A missing or `null` result decodes to an empty list.
///
/// # Errors
///
/// * [`TelemetryError::Protocol`] if the envelope or inner JSON is
///   malformed, or the service reports a `Code` other than
///   [`SUCCESS_CODE`].
/// * [`TelemetryError::Decode`] if `result` has the wrong shape.
pub fn decode_response<T: DeserializeOwned>(
    endpoint: &str,
    body: &str,
) -> Result<Vec<T>, TelemetryError> {
    let protocol = |message: String| TelemetryError::Protocol {
        endpoint: endpoint.to_string(),
        message,
    };

    let inner = unwrap_envelope(body).map_err(|e| protocol(format!("{e} ({})", preview(body))))?;

    let payload: Payload = serde_json::from_str(&inner)
        .map_err(|e| protocol(format!("invalid JSON payload: {e} ({})", preview(&inner))))?;

    let code = value_text(&payload.code);
    if code != SUCCESS_CODE {
        return Err(protocol(format!(
            "request failed with code {code:?}: {}",
            value_text(&payload.message)
        )));
    }

    if payload.result.is_null() {
        return Ok(Vec::new());
    }

    serde_json::from_value(payload.result).map_err(|source| TelemetryError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

/// Returns the text content of the document's root element.
///
/// Newlines are removed before parsing. Text from nested elements and
/// `CDATA` sections is concatenated in document order.
///
/// # Errors
///
/// Returns the parser error if the body is not a well-formed XML document.
pub fn unwrap_envelope(body: &str) -> Result<String, roxmltree::Error> {
    let cleaned = body.replace(['\n', '\r'], "");
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let doc = roxmltree::Document::parse_with_options(cleaned.trim(), options)?;

    Ok(doc
        .root_element()
        .descendants()
        .filter(roxmltree::Node::is_text)
        .filter_map(|node| node.text())
        .collect())
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn preview(text: &str) -> String {
    if text.len() > BODY_PREVIEW_LEN {
        let mut end = BODY_PREVIEW_LEN;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &text[..end])
    } else {
        text.to_string()
    }
}
