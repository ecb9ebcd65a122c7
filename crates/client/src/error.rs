//! Client error model.
//!
//! Every failure falls into one of three categories, each surfaced
//! differently: local validation (inline, no request made), backend
//! rejection (server message shown verbatim) and transport failure (generic
//! alert). None of them is fatal and none is retried automatically.

use medstock_core::DomainError;
use serde::Deserialize;
use thiserror::Error;

/// Text shown for transport failures.
pub const GENERIC_FAILURE: &str = "The request could not be completed. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Rejected,
    Transport,
}

#[derive(Debug, Error)]
pub enum ClientError {
    /// Caught locally before any network call.
    #[error("{0}")]
    Validation(String),

    /// The backend answered with a non-success status.
    #[error("backend rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Network, timeout or response decoding failure.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl ClientError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ClientError::Validation(_) => ErrorCategory::Validation,
            ClientError::Rejected { .. } => ErrorCategory::Rejected,
            ClientError::Transport(_) => ErrorCategory::Transport,
        }
    }

    /// What the user sees.
    pub fn alert_text(&self) -> String {
        match self {
            ClientError::Validation(msg) => msg.clone(),
            ClientError::Rejected { message, .. } => message.clone(),
            ClientError::Transport(_) => GENERIC_FAILURE.to_string(),
        }
    }
}

impl From<DomainError> for ClientError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg)
            | DomainError::InvariantViolation(msg)
            | DomainError::InvalidId(msg)
            | DomainError::Conflict(msg) => ClientError::Validation(msg),
            DomainError::NotFound => ClientError::Validation("not found".to_string()),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

/// Error body returned by the backend: `{ "error": "...", "message": "..." }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorBody {
    /// Message to surface for a failed response: the body's `message`, else
    /// its raw text, else the status line.
    pub fn message_for(status: u16, body: &str) -> String {
        let parsed = serde_json::from_str::<ApiErrorBody>(body).ok();
        if let Some(msg) = parsed
            .as_ref()
            .and_then(|b| b.message.as_deref())
            .filter(|m| !m.trim().is_empty())
        {
            return msg.to_string();
        }
        if let Some(code) = parsed.and_then(|b| b.error).filter(|c| !c.trim().is_empty()) {
            return code;
        }
        let text = body.trim();
        if !text.is_empty() && !text.starts_with('{') {
            return text.to_string();
        }
        format!("request failed with status {status}")
    }
}

/// A dismissible alert attached to a screen or dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub category: ErrorCategory,
    pub message: String,
}

impl From<&ClientError> for Alert {
    fn from(err: &ClientError) -> Self {
        Alert {
            category: err.category(),
            message: err.alert_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_surfaces_server_message_verbatim() {
        let err = ClientError::Rejected {
            status: 409,
            message: "Order already sent".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Rejected);
        assert_eq!(err.alert_text(), "Order already sent");
    }

    #[test]
    fn transport_uses_generic_text() {
        let err = ClientError::Transport("connection refused".to_string());
        assert_eq!(err.alert_text(), GENERIC_FAILURE);
        assert_eq!(Alert::from(&err).category, ErrorCategory::Transport);
    }

    #[test]
    fn domain_errors_become_local_validation() {
        let err: ClientError = DomainError::validation("comments are required").into();
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.alert_text(), "comments are required");
    }

    #[test]
    fn error_body_message_extraction() {
        assert_eq!(
            ApiErrorBody::message_for(422, r#"{"error":"invalid_transition","message":"Cannot send a draft"}"#),
            "Cannot send a draft"
        );
        assert_eq!(
            ApiErrorBody::message_for(400, r#"{"error":"validation_error"}"#),
            "validation_error"
        );
        assert_eq!(ApiErrorBody::message_for(502, "Bad Gateway"), "Bad Gateway");
        assert_eq!(ApiErrorBody::message_for(500, ""), "request failed with status 500");
    }
}
