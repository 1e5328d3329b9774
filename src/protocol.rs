//! Wire envelopes exchanged with the glasses.
//!
//! Every command is a JSON object `{"path", "id", "method", "body"?}` and every
//! answer carries the `id` of the request it belongs to. The path encodes the
//! kind of operation through a one-character sigil appended to the object path.

use crate::error::{G3Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifiers wrap at this modulus
pub const ID_MODULUS: u32 = 1024;

/// API request structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub path: String,
    pub id: u32,
    pub method: Method,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// API methods
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

/// Operation kind, selected by the sigil appended to the object path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Property,
    Action,
    Signal,
}

impl PathKind {
    pub fn sigil(self) -> char {
        match self {
            PathKind::Property => '.',
            PathKind::Action => '!',
            PathKind::Signal => ':',
        }
    }
}

/// Build the full path for a member of an API object
///
/// ```
/// use tobii_g3::{path_for, PathKind};
///
/// assert_eq!(path_for(PathKind::Property, "system/battery", "level"), "system/battery.level");
/// assert_eq!(path_for(PathKind::Action, "recorder", "start"), "recorder!start");
/// ```
pub fn path_for(kind: PathKind, base_path: &str, name: &str) -> String {
    format!("{}{}{}", base_path, kind.sigil(), name)
}

impl Request {
    /// Property read; the only request sent without a body
    pub fn get(path: impl Into<String>, id: u32) -> Self {
        Self {
            path: path.into(),
            id,
            method: Method::Get,
            body: None,
        }
    }

    /// Property write, action invocation or signal subscription
    pub fn post(path: impl Into<String>, id: u32, body: Value) -> Self {
        Self {
            path: path.into(),
            id,
            method: Method::Post,
            body: Some(body),
        }
    }
}

/// Serialize a request envelope to its wire text
pub fn encode_request(request: &Request) -> Result<String> {
    Ok(serde_json::to_string(request)?)
}

/// API response structure
///
/// The raw envelope is kept so mismatches and error markers can be reported
/// with the full payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: Option<u64>,
    pub body: Value,
    pub raw: Value,
}

/// Parse a response envelope
///
/// If the envelope has no `body` key the whole envelope is used as the body.
pub fn decode_response(text: &str) -> Result<Response> {
    let raw: Value =
        serde_json::from_str(text).map_err(|e| G3Error::Malformed(format!("{}: {}", e, text)))?;

    let obj = raw
        .as_object()
        .ok_or_else(|| G3Error::Malformed(format!("response is not an object: {}", text)))?;

    let id = obj.get("id").and_then(integral_id);
    let body = match obj.get("body") {
        Some(body) => body.clone(),
        None => raw.clone(),
    };

    Ok(Response { id, body, raw })
}

impl Response {
    /// Whether this response answers the request with the given id
    pub fn matches(&self, request_id: u32) -> bool {
        self.id == Some(u64::from(request_id))
    }

    /// Error reported by the glasses, either as `error_info` or as `error` + `message`
    pub fn error_message(&self) -> Option<String> {
        if let Some(info) = self.raw.get("error_info") {
            return Some(value_text(info));
        }
        let error = self.raw.get("error")?;
        let message = self
            .raw
            .get("message")
            .map(value_text)
            .unwrap_or_default();
        Some(format!("Error {}: {}", value_text(error), message))
    }

    /// The glasses signal rejection with a literal `false` body
    pub fn is_rejected(&self) -> bool {
        self.body == Value::Bool(false)
    }
}

/// Ids sent back as `1.0` still count as integer ids
fn integral_id(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
            .map(|f| f as u64)
    })
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Monotonic request id counter, wrapping at [`ID_MODULUS`]
///
/// The first id handed out is 1.
#[derive(Debug, Default, Clone)]
pub struct IdGenerator {
    last: u32,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> u32 {
        self.last = (self.last + 1) % ID_MODULUS;
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_sigils() {
        assert_eq!(
            path_for(PathKind::Property, "system/battery", "level"),
            "system/battery.level"
        );
        assert_eq!(path_for(PathKind::Action, "recorder", "start"), "recorder!start");
        assert_eq!(path_for(PathKind::Signal, "recorder", "event"), "recorder:event");
    }

    #[test]
    fn test_get_omits_body() {
        let wire = encode_request(&Request::get("system.time", 5)).unwrap();
        let value: Value = serde_json::from_str(&wire).unwrap();
        assert_eq!(value, json!({"path": "system.time", "id": 5, "method": "GET"}));
    }

    #[test]
    fn test_post_keeps_body() {
        let wire = encode_request(&Request::post("recorder!start", 6, json!([]))).unwrap();
        let value: Value = serde_json::from_str(&wire).unwrap();
        assert_eq!(
            value,
            json!({"path": "recorder!start", "id": 6, "method": "POST", "body": []})
        );
    }

    #[test]
    fn test_encoded_id_is_recovered_by_decoder() {
        let mut ids = IdGenerator::new();
        for _ in 0..3 {
            let id = ids.next_id();
            let wire = encode_request(&Request::post("settings.gaze_overlay", id, json!(true))).unwrap();
            let response = decode_response(&wire).unwrap();
            assert!(response.matches(id));
        }
    }

    #[test]
    fn test_body_falls_back_to_envelope() {
        let response = decode_response(r#"{"id": 3, "error": 404}"#).unwrap();
        assert_eq!(response.body, json!({"id": 3, "error": 404}));

        let response = decode_response(r#"{"id": 3, "body": null}"#).unwrap();
        assert_eq!(response.body, Value::Null);
    }

    #[test]
    fn test_malformed_response() {
        let err = decode_response("not json").unwrap_err();
        assert!(matches!(err, G3Error::Malformed(_)));

        let err = decode_response("[1, 2]").unwrap_err();
        assert!(matches!(err, G3Error::Malformed(_)));
    }

    #[test]
    fn test_missing_id_never_matches() {
        let response = decode_response(r#"{"body": 1}"#).unwrap();
        assert_eq!(response.id, None);
        assert!(!response.matches(0));
    }

    #[test]
    fn test_integral_float_id_matches() {
        let response = decode_response(r#"{"id": 4.0, "body": 1}"#).unwrap();
        assert_eq!(response.id, Some(4));
        assert!(response.matches(4));

        let response = decode_response(r#"{"id": 4.5, "body": 1}"#).unwrap();
        assert_eq!(response.id, None);

        let response = decode_response(r#"{"id": "4", "body": 1}"#).unwrap();
        assert_eq!(response.id, None);
    }

    #[test]
    fn test_error_markers() {
        let response = decode_response(r#"{"id": 1, "error_info": "busy"}"#).unwrap();
        assert_eq!(response.error_message().unwrap(), "busy");

        let response =
            decode_response(r#"{"id": 1, "error": 3, "message": "no card"}"#).unwrap();
        assert_eq!(response.error_message().unwrap(), "Error 3: no card");

        let response = decode_response(r#"{"id": 1, "body": true}"#).unwrap();
        assert!(response.error_message().is_none());
    }

    #[test]
    fn test_only_literal_false_is_rejection() {
        assert!(decode_response(r#"{"id": 1, "body": false}"#).unwrap().is_rejected());
        assert!(!decode_response(r#"{"id": 1, "body": 0}"#).unwrap().is_rejected());
        assert!(!decode_response(r#"{"id": 1, "body": null}"#).unwrap().is_rejected());
    }

    #[test]
    fn test_ids_increase_and_wrap() {
        let mut ids = IdGenerator::new();
        assert_eq!(ids.next_id(), 1);
        let mut prev = 1;
        for _ in 0..2048 {
            let id = ids.next_id();
            assert_eq!(id, (prev + 1) % ID_MODULUS);
            prev = id;
        }
    }

    #[test]
    fn test_ids_unique_within_window() {
        let mut ids = IdGenerator::new();
        let window: std::collections::HashSet<u32> =
            (0..ID_MODULUS).map(|_| ids.next_id()).collect();
        assert_eq!(window.len(), ID_MODULUS as usize);
    }
}
