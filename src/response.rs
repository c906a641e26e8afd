//! Response normalization.
//!
//! The two endpoint families of the analysis service report errors differently. The static
//! API answers with an `{"error": "…"}` object, while the dynamic and instrumentation APIs
//! answer with `{"status": "failed", "message": "…"}`. Both are turned into a
//! [`Kind::BackendRejection`] here; anything else that fails is a transport failure.

use crate::error::{Kind, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Checks the status and body of a received response.
///
/// Returns the body untouched if the response is a success, the normalized error otherwise.
pub fn normalize(status: u16, body: &[u8]) -> Result<&[u8]> {
    let json = serde_json::from_slice::<Value>(body).ok();

    if let Some(message) = json.as_ref().and_then(rejection_message) {
        return Err(Kind::rejection(status, message));
    }

    if (200..300).contains(&status) {
        Ok(body)
    } else {
        Err(Kind::transport(
            format!("request failed with status code {}", status),
            Some(status),
        ))
    }
}

/// Maps an error of the HTTP stack to a transport failure.
pub fn from_reqwest(error: &reqwest::Error) -> Kind {
    let message = if error.is_timeout() {
        format!("the request timed out: {}", error)
    } else {
        error.to_string()
    };
    let message = if message.trim().is_empty() {
        String::from("no response was received from the analysis service")
    } else {
        message
    };

    Kind::transport(message, error.status().map(|s| s.as_u16()))
}

/// Decodes a successful JSON body into the result type of the endpoint.
pub fn decode<T: DeserializeOwned>(endpoint: &str, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| Kind::Decode {
        endpoint: endpoint.to_owned(),
        message: e.to_string(),
    })
}

/// Extracts the backend error message of a structured error body, if present.
fn rejection_message(json: &Value) -> Option<String> {
    let object = json.as_object()?;

    if let Some(error) = object.get("error") {
        return Some(match error {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        });
    }

    match object.get("status").and_then(Value::as_str) {
        Some(status) if status.eq_ignore_ascii_case("failed") => Some(
            object
                .get("message")
                .map(|m| match m {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default(),
        ),
        _ => None,
    }
}
