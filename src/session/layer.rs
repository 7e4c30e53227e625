use axum::extract::{Request, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderValue, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use tracing::warn;

use super::cookies::{clear_cookie, now_millis, set_cookie, SessionCookies};
use super::gate::{GateOutcome, SessionGate};

/// axum middleware applying [`SessionGate`] to every request.
///
/// Mount with `axum::middleware::from_fn_with_state(gate, session_gate)`.
/// The activity cookie is only written after the remote check resolves and
/// the inner handler has produced its response, so a request dropped
/// mid-check leaves no trace.
pub async fn session_gate(State(gate): State<SessionGate>, req: Request, next: Next) -> Response {
    let cookies = SessionCookies::from_headers(req.headers(), gate.config());
    let path = req.uri().path().to_owned();
    let method = req.method().clone();
    let outcome = gate.evaluate(&path, &cookies, now_millis()).await;
    let cfg = gate.config();
    match outcome {
        GateOutcome::Allow => next.run(req).await,
        GateOutcome::AllowAndTouch { now_ms } => {
            let mut resp = next.run(req).await;
            let cookie = set_cookie(&cfg.activity_cookie, &now_ms.to_string(), cfg.activity_cookie_max_age, cfg.secure_cookies);
            append_cookie(&mut resp, cookie);
            resp
        }
        GateOutcome::RedirectLogin { .. } => {
            let mut resp = redirect(&method, &cfg.login_path);
            append_cookie(&mut resp, clear_cookie(&cfg.session_cookie, cfg.secure_cookies));
            append_cookie(&mut resp, clear_cookie(&cfg.activity_cookie, cfg.secure_cookies));
            resp
        }
        GateOutcome::RedirectDashboard => redirect(&method, &cfg.protected_root),
    }
}

/// 307 for reads; form posts get 303 so the browser follows with a GET.
fn redirect(method: &Method, location: &str) -> Response {
    if method == Method::GET || method == Method::HEAD {
        Redirect::temporary(location).into_response()
    } else {
        Redirect::to(location).into_response()
    }
}

/// Append a `Set-Cookie` header, skipping values that are not valid header text.
pub(crate) fn append_cookie(resp: &mut Response, cookie: String) {
    match HeaderValue::try_from(cookie) {
        Ok(v) => {
            resp.headers_mut().append(SET_COOKIE, v);
        }
        Err(e) => warn!(target: "gate", "dropping unencodable cookie: {}", e),
    }
}
