//! Transport-level errors and backend error decoding.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Network(String),

    /// 401 that survived a refresh attempt (or no session to refresh).
    #[error("not signed in")]
    Unauthorized,

    /// The backend answered with an error status.
    #[error("backend error {status}: {message}")]
    Backend {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// The backend's string error code, if it sent one.
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Backend { code, .. } => code.as_deref(),
            ApiError::Unauthorized => Some("UNAUTHORIZED"),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Backend { status, .. } => Some(*status),
            ApiError::Unauthorized => Some(401),
            _ => None,
        }
    }

    /// Builds a `Backend` error from an HTTP status and raw response body.
    ///
    /// Understands PostgREST `{code, message}`, Edge Function
    /// `{error: {code, message}}` / `{error: "CODE", message}` bodies, and
    /// falls back to the body text.
    pub fn from_response(status: u16, body: &str) -> Self {
        let (mut code, message) = match serde_json::from_str::<Value>(body) {
            Ok(json) => decode_error_body(&json),
            Err(_) => (None, None),
        };
        // `raise exception 'CODE'` in a Postgres function surfaces as P0001
        // with the code in the message.
        if code.as_deref() == Some(RAISE_EXCEPTION) {
            if let Some(m) = message.as_deref().filter(|m| is_error_code(m)) {
                code = Some(m.to_string());
            }
        }
        ApiError::Backend {
            status,
            code,
            message: message.unwrap_or_else(|| {
                if body.trim().is_empty() {
                    format!("HTTP {status}")
                } else {
                    body.trim().to_string()
                }
            }),
        }
    }
}

const RAISE_EXCEPTION: &str = "P0001";

fn is_error_code(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_uppercase() || c == '_' || c.is_ascii_digit())
}

fn decode_error_body(json: &Value) -> (Option<String>, Option<String>) {
    let text = |v: Option<&Value>| v.and_then(Value::as_str).map(str::to_string);

    match json.get("error") {
        Some(Value::Object(inner)) => (text(inner.get("code")), text(inner.get("message"))),
        Some(Value::String(code)) => (
            Some(code.clone()),
            text(json.get("message")).or_else(|| text(json.get("error_description"))),
        ),
        _ => (
            text(json.get("code")).or_else(|| text(json.get("error_code"))),
            text(json.get("message")).or_else(|| text(json.get("msg"))),
        ),
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_edge_function_error() {
        let err = ApiError::from_response(
            400,
            r#"{"error":{"code":"INVALID_OTP","message":"Incorrect code"}}"#,
        );
        assert_eq!(err.code(), Some("INVALID_OTP"));
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn decodes_flat_error_string() {
        let err = ApiError::from_response(409, r#"{"error":"STAFF_ALREADY_EXISTS"}"#);
        assert_eq!(err.code(), Some("STAFF_ALREADY_EXISTS"));
    }

    #[test]
    fn decodes_postgrest_error() {
        let err = ApiError::from_response(
            400,
            r#"{"code":"P0001","message":"INVALID_STATUS_TRANSITION","details":null}"#,
        );
        assert_eq!(err.code(), Some("INVALID_STATUS_TRANSITION"));

        let err = ApiError::from_response(
            400,
            r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#,
        );
        assert_eq!(err.code(), Some("23505"));
    }

    #[test]
    fn plain_text_body_becomes_message() {
        let err = ApiError::from_response(502, "Bad Gateway");
        assert_eq!(
            err,
            ApiError::Backend {
                status: 502,
                code: None,
                message: "Bad Gateway".into()
            }
        );
    }
}
