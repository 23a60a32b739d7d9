//! Error type shared by every request and mutation in the console.
use serde_json::Value;

pub const CONNECTION_MESSAGE: &str = "Error de conexión con el servidor";
pub const DEFAULT_MESSAGE: &str = "Ocurrió un error inesperado";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http {status}: {message:?}")]
    Status { status: u16, message: Option<String> },
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{0}")]
    Unknown(String),
}

/// How a failure is presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transport,
    Rejected,
    Unknown,
}

impl ApiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) => ErrorCategory::Transport,
            Self::Rejected(_) => ErrorCategory::Rejected,
            Self::Status { message: Some(m), .. } if !m.trim().is_empty() => ErrorCategory::Rejected,
            Self::Status { status, .. } if *status == 0 => ErrorCategory::Transport,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Spanish text for toasts and inline errors. `fallback` is the
    /// action-specific default used when the server gave nothing usable.
    pub fn user_message(&self, fallback: &str) -> String {
        let fallback = if fallback.trim().is_empty() { DEFAULT_MESSAGE } else { fallback };
        match self.category() {
            ErrorCategory::Transport => CONNECTION_MESSAGE.to_string(),
            ErrorCategory::Rejected => match self {
                Self::Rejected(m) | Self::Status { message: Some(m), .. } if !m.trim().is_empty() => m.clone(),
                _ => fallback.to_string(),
            },
            ErrorCategory::Unknown => fallback.to_string(),
        }
    }

    /// Builds a `Status` error, pulling `mensaje`/`message`/`error` out of
    /// the body when the server sent one.
    pub fn from_status(status: u16, body: &Value) -> Self {
        Self::Status { status, message: server_message(body) }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

pub fn server_message(body: &Value) -> Option<String> {
    ["mensaje", "message", "error"]
        .iter()
        .filter_map(|k| body.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|m| !m.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transport_failures_use_generic_text() {
        let err = ApiError::Transport("dns".into());
        assert_eq!(err.category(), ErrorCategory::Transport);
        assert_eq!(err.user_message("x"), CONNECTION_MESSAGE);
    }

    #[test]
    fn rejections_surface_server_text() {
        let err = ApiError::Rejected("RUC duplicado".into());
        assert_eq!(err.user_message("Error al crear"), "RUC duplicado");

        let blank = ApiError::Rejected("  ".into());
        assert_eq!(blank.user_message("Error al crear"), "Error al crear");
    }

    #[test]
    fn status_with_body_message_counts_as_rejection() {
        let err = ApiError::from_status(400, &json!({"success": false, "message": "Stock insuficiente"}));
        assert_eq!(err.category(), ErrorCategory::Rejected);
        assert_eq!(err.user_message("x"), "Stock insuficiente");

        let bare = ApiError::from_status(500, &Value::Null);
        assert_eq!(bare.category(), ErrorCategory::Unknown);
        assert_eq!(bare.user_message("Error al guardar"), "Error al guardar");
        assert_eq!(bare.user_message(""), DEFAULT_MESSAGE);
    }

    #[test]
    fn server_message_prefers_mensaje() {
        let body = json!({"message": "b", "mensaje": "a"});
        assert_eq!(server_message(&body).as_deref(), Some("a"));
        assert_eq!(server_message(&json!({"error": "c"})).as_deref(), Some("c"));
        assert_eq!(server_message(&json!({"ok": true})), None);
    }
}
