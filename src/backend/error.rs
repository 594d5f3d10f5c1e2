use serde::Deserialize;
use thiserror::Error;

pub type BackendResult<T> = Result<T, BackendError>;

/// Failure of a single backend call. Carries what the backend said; no
/// further classification is applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("invalid backend configuration: {0}")]
    Config(String),

    #[error("backend request failed: {0}")]
    Transport(String),

    #[error("backend returned status {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("failed to decode backend response: {0}")]
    Decode(String),

    #[error("realtime channel error: {0}")]
    Realtime(String),
}

/// Union of the error bodies returned by the REST and auth endpoints.
#[derive(Deserialize, Default)]
struct ErrorBody {
    code: Option<serde_json::Value>,
    error_code: Option<String>,
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl BackendError {
    pub(crate) fn from_response(status: u16, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        let code = parsed.error_code.or_else(|| {
            parsed.code.map(|c| match c {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
        });
        let message = parsed
            .message
            .or(parsed.msg)
            .or(parsed.error_description)
            .or(parsed.error)
            .unwrap_or_else(|| body.to_string());
        BackendError::Api {
            status,
            code,
            message,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgrest_error_body() {
        let err = BackendError::from_response(
            409,
            r#"{"code":"23505","message":"duplicate key value","details":null,"hint":null}"#,
        );
        assert_eq!(
            err,
            BackendError::Api {
                status: 409,
                code: Some("23505".to_string()),
                message: "duplicate key value".to_string(),
            }
        );
    }

    #[test]
    fn test_auth_error_bodies() {
        let err = BackendError::from_response(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert!(err.to_string().contains("Invalid login credentials"));

        let err = BackendError::from_response(
            422,
            r#"{"code":422,"error_code":"weak_password","msg":"Password should be at least 6 characters"}"#,
        );
        match err {
            BackendError::Api { code, message, .. } => {
                assert_eq!(code.as_deref(), Some("weak_password"));
                assert!(message.starts_with("Password should"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_non_json_body_kept_verbatim() {
        let err = BackendError::from_response(502, "Bad Gateway");
        assert_eq!(err.status(), Some(502));
        assert!(err.to_string().ends_with("Bad Gateway"));
    }
}
