//! Boundary decoding of backend responses.
//!
//! The backend wraps payloads as `{success, data, message}`, but not
//! uniformly: some endpoints nest a second `data` level, some return the bare
//! payload. [`decode_payload`] tries those shapes in a fixed order and fails
//! with [`ApiError::Decode`] when none of them matches the expected type.

use crate::error::{ApiError, ApiResult};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// `success` flag of an envelope, if the body has one
pub fn envelope_success(body: &Value) -> Option<bool> {
    body.get("success").and_then(Value::as_bool)
}

/// `message` of an envelope, if the body has one
pub fn envelope_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .or_else(|| body.get("error").and_then(Value::as_str))
        .map(str::to_string)
}

/// Candidate payloads, most specific first: `data.data`, `data`, body.
pub fn candidates(body: &Value) -> Vec<&Value> {
    let mut out = Vec::with_capacity(3);
    if let Some(data) = body.get("data") {
        if let Some(inner) = data.get("data") {
            out.push(inner);
        }
        out.push(data);
    }
    out.push(body);
    out
}

/// Drop `id` from every object that also carries `_id`.
///
/// Records alias `_id` to `id`, and serde rejects an object holding both as
/// a duplicate field. Some backend serializers emit the virtual `id` next to
/// `_id` with the same value, so `_id` wins.
pub fn normalize_ids(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.contains_key("_id") {
                map.remove("id");
            }
            map.values_mut().for_each(normalize_ids);
        }
        Value::Array(items) => items.iter_mut().for_each(normalize_ids),
        _ => {}
    }
}

/// Decode the payload of `body` as `T`.
///
/// # Errors
///
/// Returns [`ApiError::Decode`] naming the endpoint and the last parse error
/// when no candidate shape deserializes into `T`.
pub fn decode_payload<T: DeserializeOwned>(endpoint: &str, body: &Value) -> ApiResult<T> {
    let mut last_error = None;
    for candidate in candidates(body) {
        match T::deserialize(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = Some(e),
        }
    }

    Err(ApiError::Decode {
        endpoint: endpoint.to_string(),
        reason: last_error.map_or_else(|| "empty response".to_string(), |e| e.to_string()),
    })
}
