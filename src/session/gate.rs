use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt; // catch_unwind on the validator future
use thiserror::Error;
use tracing::{debug, warn};

use super::cookies::SessionCookies;
use super::route::{classify, RouteClass};
use super::validator::{SessionCheck, SessionValidator};
use crate::config::GateConfig;

/// Why a session was judged invalid. Every variant ends the same way, with a
/// redirect to the login page and both cookies cleared; the distinction only
/// feeds logging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("no session token")]
    SessionMissing,
    #[error("identity service rejected the session (status {status})")]
    RemoteRejected { status: u16 },
    #[error("identity service unavailable: {reason}")]
    RemoteUnavailable { reason: String },
    #[error("session idle past the inactivity window")]
    SessionExpired,
}

/// Terminal decision for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Pass the request through untouched.
    Allow,
    /// Pass the request through and stamp the activity cookie with `now_ms`.
    AllowAndTouch { now_ms: i64 },
    /// Clear both cookies and send the caller to the login page.
    RedirectLogin { reason: Rejection },
    /// Already signed in: leave the login page for the protected root.
    RedirectDashboard,
}

#[derive(Clone)]
pub struct SessionGate {
    config: Arc<GateConfig>,
    validator: Arc<dyn SessionValidator>,
}

impl SessionGate {
    pub fn new(config: GateConfig, validator: Arc<dyn SessionValidator>) -> Self {
        Self { config: Arc::new(config), validator }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        classify(path, &self.config)
    }

    /// Decide what happens to a request for `path` carrying `cookies` at
    /// wall-clock `now_ms`.
    pub async fn evaluate(&self, path: &str, cookies: &SessionCookies, now_ms: i64) -> GateOutcome {
        match self.classify(path) {
            RouteClass::Bypass => GateOutcome::Allow,
            RouteClass::LoginPage => match self.check_validity(cookies, now_ms).await {
                Ok(()) => GateOutcome::RedirectDashboard,
                Err(_) => GateOutcome::Allow,
            },
            RouteClass::Protected => match self.check_validity(cookies, now_ms).await {
                Ok(()) => GateOutcome::AllowAndTouch { now_ms },
                Err(reason) => {
                    debug!(target: "gate", path, %reason, "session rejected");
                    GateOutcome::RedirectLogin { reason }
                }
            },
        }
    }

    /// Token present, accepted by the identity service, and recently active.
    /// The remote and local checks are independent: passing one never
    /// excuses the other.
    pub async fn check_validity(&self, cookies: &SessionCookies, now_ms: i64) -> Result<(), Rejection> {
        let Some(token) = cookies.token() else {
            return Err(Rejection::SessionMissing);
        };
        match self.remote_check(token).await {
            SessionCheck::Valid => {}
            SessionCheck::Rejected { status } => return Err(Rejection::RemoteRejected { status }),
            SessionCheck::Unavailable { reason } => return Err(Rejection::RemoteUnavailable { reason }),
        }
        if !self.is_active(cookies.last_activity.as_deref(), now_ms) {
            return Err(Rejection::SessionExpired);
        }
        Ok(())
    }

    /// True when `last_activity` parses as epoch milliseconds less than the
    /// inactivity window before `now_ms`. A timestamp in the future counts
    /// as active. Parsing is strict on purpose: a value with trailing junk
    /// such as `123abc` is not a timestamp and the session counts as expired.
    pub fn is_active(&self, last_activity: Option<&str>, now_ms: i64) -> bool {
        let Some(ts) = last_activity.and_then(|v| v.trim().parse::<i64>().ok()) else {
            return false;
        };
        let window = i64::try_from(self.config.inactivity_timeout.as_millis()).unwrap_or(i64::MAX);
        now_ms.saturating_sub(ts) < window
    }

    /// Ask the validator, bounded by the configured timeout. Timeouts and
    /// panics inside the validator become `Unavailable`.
    async fn remote_check(&self, token: &str) -> SessionCheck {
        let fut = AssertUnwindSafe(self.validator.check_session(token)).catch_unwind();
        match tokio::time::timeout(self.config.remote_check_timeout, fut).await {
            Ok(Ok(check)) => check,
            Ok(Err(panic_payload)) => {
                let msg = if let Some(s) = panic_payload.downcast_ref::<&str>() { *s }
                          else if let Some(s) = panic_payload.downcast_ref::<String>() { s.as_str() }
                          else { "panic" };
                warn!(target: "gate", "session validator panicked: {}", msg);
                SessionCheck::Unavailable { reason: format!("validator panic: {}", msg) }
            }
            Err(_) => {
                warn!(target: "gate", timeout_ms = self.config.remote_check_timeout.as_millis() as u64, "session check timed out");
                SessionCheck::Unavailable { reason: "timeout".to_string() }
            }
        }
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod gate_tests;
