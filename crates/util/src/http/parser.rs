//! # Response parsing
//!
//! Interprets a [`RawResponse`] coming back from the transport: health of
//! the status code, strict JSON decoding with a body preview on failure, and
//! the platform's in-band exception envelope (`isException`).

use mpx_api::RawResponse;
use mpx_types::{MpxError, Page, Result};
use serde_json::Value;

/// Return a user-friendly hint for common HTTP status codes.
///
/// # Example
/// ```rust
/// use mpx_util::http::status_error_message;
///
/// assert!(status_error_message(401).unwrap().contains("MPX_TOKEN"));
/// assert!(status_error_message(404).is_none());
/// ```
pub fn status_error_message(status_code: u16) -> Option<String> {
    match status_code {
        401 => Some("Unauthorized (401). Hint: set MPX_TOKEN=... or sign in again".into()),
        403 => Some("Forbidden (403). Hint: check the account and the user's roles".into()),
        _ => None,
    }
}

/// Parse HTTP response text into JSON, providing detailed errors on failure.
///
/// The error carries the status code and up to 200 characters of the body
/// (whitespace collapsed) to aid debugging truncated or malformed payloads.
pub fn parse_response_json_strict(text: &str, status: Option<u16>) -> Result<Value> {
    serde_json::from_str::<Value>(text).map_err(|error| {
        let status_note = status
            .map(|code| format!("response (status {code})"))
            .unwrap_or_else(|| "response (unknown status)".to_string());
        MpxError::decode(status_note, error.to_string(), truncate_response_preview(text, 200))
    })
}

fn truncate_response_preview(text: &str, limit: usize) -> String {
    if text.trim().is_empty() {
        return "<empty>".to_string();
    }

    let mut preview = String::new();
    for ch in text.chars() {
        if preview.len() >= limit {
            preview.push_str("...");
            break;
        }
        match ch {
            '\n' | '\r' | '\t' => {
                if !preview.ends_with(' ') {
                    preview.push(' ');
                }
            }
            _ => preview.push(ch),
        }
    }

    preview.trim().to_string()
}

/// A transport response with the platform's success rules applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    raw: RawResponse,
}

impl From<RawResponse> for Response {
    fn from(raw: RawResponse) -> Self {
        Self { raw }
    }
}

impl Response {
    pub fn status(&self) -> u16 {
        self.raw.status
    }

    pub fn body(&self) -> &str {
        &self.raw.body
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.raw
            .headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// 2xx and 3xx are healthy.
    pub fn is_healthy(&self) -> bool {
        (200..400).contains(&self.raw.status)
    }

    /// Whether the body is the platform's exception envelope.
    pub fn is_service_exception(&self) -> bool {
        serde_json::from_str::<Value>(&self.raw.body)
            .map(|value| is_exception(&value))
            .unwrap_or(false)
    }

    /// The decoded body.
    ///
    /// Fails with `Remote` on an unhealthy status or an exception envelope
    /// (even one sent with a 200) and with `Decode` when the body is not JSON.
    /// An empty healthy body decodes to `Value::Null`.
    pub fn data(&self) -> Result<Value> {
        let status = self.raw.status;
        if !self.is_healthy() {
            if let Ok(value) = serde_json::from_str::<Value>(&self.raw.body)
                && is_exception(&value)
            {
                return Err(exception_error(status, &value));
            }
            return Err(match status_error_message(status) {
                Some(hint) => MpxError::Remote {
                    status,
                    title: "UnhealthyResponse".to_string(),
                    description: hint,
                    correlation_id: String::new(),
                },
                None => MpxError::remote_status(status),
            });
        }
        if self.raw.body.trim().is_empty() {
            return Ok(Value::Null);
        }

        let value = parse_response_json_strict(&self.raw.body, Some(status))?;
        if is_exception(&value) {
            return Err(exception_error(status, &value));
        }
        Ok(value)
    }

    /// The body decoded as a feed page.
    pub fn page(&self) -> Result<Page> {
        match self.data()? {
            Value::Null => Err(MpxError::decode(
                "page",
                "empty response body",
                truncate_response_preview(&self.raw.body, 200),
            )),
            value => Page::from_value(value),
        }
    }
}

fn is_exception(value: &Value) -> bool {
    value.get("isException").and_then(Value::as_bool).unwrap_or(false)
}

fn exception_error(status: u16, value: &Value) -> MpxError {
    let text = |key: &str| value.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
    let status = value
        .get("responseCode")
        .and_then(Value::as_u64)
        .and_then(|code| u16::try_from(code).ok())
        .unwrap_or(status);
    MpxError::Remote {
        status,
        title: text("title"),
        description: text("description"),
        correlation_id: text("correlationId"),
    }
}
