//! Error types for gateway operations.

use serde::Deserialize;
use thiserror::Error;

/// PostgREST code returned when a single-row request matched zero (or many) rows.
pub const NOT_FOUND_CODE: &str = "PGRST116";

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Row not found")]
    NotFound,

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid gateway configuration: {0}")]
    Config(String),
}

/// Error body returned by the REST layer.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl GatewayError {
    /// Build an error from a non-success response body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<ApiErrorBody> = serde_json::from_str(body).ok();
        let code = parsed
            .as_ref()
            .and_then(|b| b.code.clone())
            .unwrap_or_default();

        if code == NOT_FOUND_CODE {
            return GatewayError::NotFound;
        }

        let message = parsed
            .and_then(|b| b.message)
            .unwrap_or_else(|| body.trim().to_string());

        GatewayError::Api {
            status,
            code,
            message,
        }
    }

    /// True for the provider's "no rows" sentinel, which callers treat as absence.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound)
    }

    /// Returns true if this error is transient and a user retry may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Http(e) => e.is_timeout() || e.is_connect(),
            GatewayError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_not_found_sentinel() {
        let body = r#"{"code":"PGRST116","details":"The result contains 0 rows","hint":null,"message":"JSON object requested, multiple (or no) rows returned"}"#;
        let err = GatewayError::from_response(406, body);
        assert!(err.is_not_found());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_api_error() {
        let body = r#"{"code":"42P01","message":"relation \"public.admins\" does not exist"}"#;
        match GatewayError::from_response(404, body) {
            GatewayError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 404);
                assert_eq!(code, "42P01");
                assert!(message.contains("admins"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_plain_text_body() {
        let err = GatewayError::from_response(503, "upstream unavailable\n");
        assert!(err.is_transient());
        assert_eq!(
            err.to_string(),
            "API error 503 (): upstream unavailable"
        );
    }
}
