//! Session gate: decides per request whether the caller holds a live
//! identity service session, and redirects or refreshes the activity cookie.
//!
//! Nothing here survives a request. All durable state lives in two cookies:
//! the session token issued at login and the last-activity timestamp the gate
//! rewrites on each allowed protected access.

mod cookies;
mod gate;
mod layer;
mod route;
mod validator;

pub use cookies::{clear_cookie, cookie_value, now_millis, set_cookie, SessionCookies};
pub use gate::{GateOutcome, Rejection, SessionGate};
pub use layer::session_gate;
pub(crate) use layer::append_cookie;
pub use route::{classify, RouteClass};
pub use validator::{SessionCheck, SessionValidator};
