use thiserror::Error;

use super::types::UiContainer;

/// Identity service call failures.
#[derive(Debug, Error)]
pub enum KratosError {
    #[error("kratos request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("kratos API error: {status} {body}")]
    Api { status: u16, body: String },

    #[error("kratos response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid kratos url: {0}")]
    InvalidUrl(String),
}

impl KratosError {
    /// HTTP status of an API rejection.
    pub fn status(&self) -> Option<u16> {
        match self {
            KratosError::Api { status, .. } => Some(*status),
            KratosError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, KratosError::Transport(_))
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Conflict on a unique trait (usually the email).
    pub fn is_conflict(&self) -> bool {
        match self {
            KratosError::Api { status, body } => *status == 409 || body.contains("duplicate"),
            _ => self.status() == Some(409),
        }
    }

    /// Error messages from a self-service flow embedded in the response body,
    /// joined with ", ". Empty when the body carries none.
    pub fn flow_error_text(&self) -> Option<String> {
        let KratosError::Api { body, .. } = self else { return None };
        #[derive(serde::Deserialize)]
        struct FlowBody {
            ui: Option<UiContainer>,
        }
        let parsed: FlowBody = serde_json::from_str(body).ok()?;
        let joined = parsed
            .ui?
            .messages
            .iter()
            .filter(|m| m.kind == "error")
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        if joined.is_empty() { None } else { Some(joined) }
    }
}
