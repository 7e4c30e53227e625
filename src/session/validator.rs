use async_trait::async_trait;

use crate::kratos::{KratosClient, KratosError};

/// Result of asking the identity service about a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCheck {
    Valid,
    /// The service answered with a non-success status.
    Rejected { status: u16 },
    /// The service could not be asked (transport failure, bad response).
    Unavailable { reason: String },
}

/// Capability the gate uses to ask whether a session token is live.
/// Implementations must not fail: every problem is a non-valid answer.
#[async_trait]
pub trait SessionValidator: Send + Sync {
    async fn check_session(&self, token: &str) -> SessionCheck;
}

#[async_trait]
impl SessionValidator for KratosClient {
    async fn check_session(&self, token: &str) -> SessionCheck {
        match self.whoami(token).await {
            Ok(_) => SessionCheck::Valid,
            Err(KratosError::Api { status, .. }) => SessionCheck::Rejected { status },
            Err(e) => SessionCheck::Unavailable { reason: e.to_string() },
        }
    }
}
