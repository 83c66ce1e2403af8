use crate::capture::correlator::ReadyResponse;
use crate::capture::source::{EventSource, ResponseBody};
use crate::error::{DecodeError, PageError};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One decoded API response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPage {
    /// Envelope status; `None` when the field is missing or not an integer
    pub status_code: Option<i64>,

    pub total_count: Option<u64>,

    pub has_more: Option<bool>,

    /// Unnormalized list entries
    pub items: Vec<Value>,

    /// The envelope exactly as received
    pub payload: Value,
}

impl RawPage {
    /// Build a page from a parsed envelope. Missing list = empty page.
    pub fn from_envelope(payload: Value) -> Result<Self, DecodeError> {
        let envelope = match &payload {
            Value::Object(map) => map,
            other => return Err(DecodeError::NotAnEnvelope(json_type(other))),
        };

        let status_code = envelope.get("status_code").and_then(Value::as_i64);
        let total_count = envelope.get("total").and_then(Value::as_u64);
        let has_more = envelope.get("has_more").and_then(|v| match v {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|n| n != 0),
            _ => None,
        });
        let items = envelope
            .get("followings")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(Self {
            status_code,
            total_count,
            has_more,
            items,
            payload,
        })
    }

    pub fn is_success(&self) -> bool {
        self.status_code == Some(0)
    }

    pub fn hint(&self) -> PaginationHint {
        PaginationHint {
            has_more: self.has_more,
            total_count: self.total_count,
        }
    }
}

/// Page metadata used only for progress reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaginationHint {
    pub has_more: Option<bool>,
    pub total_count: Option<u64>,
}

/// Decode a fetched body into text, then into an envelope
pub fn decode_body(body: ResponseBody) -> Result<RawPage, DecodeError> {
    let text = if body.base64_encoded {
        let bytes = STANDARD.decode(body.body.trim())?;
        String::from_utf8(bytes)?
    } else {
        body.body
    };

    let payload: Value = serde_json::from_str(&text)?;
    RawPage::from_envelope(payload)
}

/// Fetch, decode and validate the body of a ready response.
///
/// Only a success envelope is returned as `Ok`.
pub fn fetch_and_decode<S: EventSource + ?Sized>(source: &S, ready: &ReadyResponse) -> Result<RawPage, PageError> {
    let body = source.fetch_body(&ready.request_id)?;
    let page = decode_body(body)?;

    if page.is_success() {
        Ok(page)
    } else {
        Err(PageError::Rejected {
            status: page.status_code,
            page: Box::new(page),
        })
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
