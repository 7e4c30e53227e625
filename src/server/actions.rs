//! Form actions. Each validates its fields, calls the identity service and
//! answers with a 303 redirect. Dashboard failures land on
//! `/dashboard?error=...`; login failures re-render the login form.

use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use tracing::{error, info, warn};

use super::views::{self, DASHBOARD_PATH};
use super::AppState;
use crate::config::parse_bool;
use crate::kratos::{CreateIdentityRequest, KratosClient, KratosError, LoginSubmission, Traits, UpdateIdentityRequest};
use crate::listing::{ListQuery, StatusFilter};
use crate::session::{append_cookie, clear_cookie, now_millis, set_cookie, SessionCookies};

const ONE_DAY: Duration = Duration::from_secs(24 * 60 * 60);
const THIRTY_DAYS: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "remember-me")]
    pub remember_me: Option<String>,
}

impl LoginForm {
    /// Browsers send `on` for a ticked checkbox and nothing otherwise.
    fn remember(&self) -> bool {
        match self.remember_me.as_deref() {
            Some(v) => v == "on" || parse_bool(v).unwrap_or(false),
            None => false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginateForm {
    #[serde(default)]
    pub page: String,
    #[serde(default)]
    pub current_search: String,
    #[serde(default)]
    pub current_status: String,
}

/// Run the password login flow and return the session token.
pub async fn authenticate(kratos: &KratosClient, email: &str, password: &str) -> Result<String, KratosError> {
    let flow = kratos.initialize_login_flow().await?;
    let submission = LoginSubmission::password(email, password, flow.csrf_token());
    let result = kratos.submit_login(&flow.id, &submission).await?;
    Ok(result.token().to_string())
}

pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let email = form.email.trim();
    if email.is_empty() || form.password.is_empty() {
        let page = views::login_page(Some("Email and password are required"), Some(email));
        return (StatusCode::BAD_REQUEST, Html(page)).into_response();
    }

    match authenticate(&state.kratos, email, &form.password).await {
        Ok(token) => {
            let gate = &state.config.gate;
            let max_age = if form.remember() { THIRTY_DAYS } else { ONE_DAY };
            let mut resp = Redirect::to(DASHBOARD_PATH).into_response();
            append_cookie(&mut resp, set_cookie(&gate.session_cookie, &token, max_age, gate.secure_cookies));
            append_cookie(
                &mut resp,
                set_cookie(&gate.activity_cookie, &now_millis().to_string(), max_age, gate.secure_cookies),
            );
            info!(target: "actions", remember = form.remember(), "login succeeded");
            resp
        }
        Err(e) => {
            warn!(target: "actions", "Login error: {}", e);
            let msg = e.flow_error_text().unwrap_or_else(|| "Invalid email or password".to_string());
            (StatusCode::UNAUTHORIZED, Html(views::login_page(Some(&msg), Some(email)))).into_response()
        }
    }
}

/// Best-effort logout at the identity service; local cookies are cleared
/// regardless of how that goes.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let gate = &state.config.gate;
    let cookies = SessionCookies::from_headers(&headers, gate);
    if let Some(token) = cookies.token() {
        let outcome = async {
            let flow = state.kratos.initialize_logout_flow(token).await?;
            state.kratos.submit_logout(&flow.logout_token).await
        }
        .await;
        if let Err(e) = outcome {
            warn!(target: "actions", "Logout error: {}", e);
        }
    }
    let mut resp = Redirect::to(&gate.login_path).into_response();
    append_cookie(&mut resp, clear_cookie(&gate.session_cookie, gate.secure_cookies));
    append_cookie(&mut resp, clear_cookie(&gate.activity_cookie, gate.secure_cookies));
    resp
}

fn dashboard_error(message: &str) -> Response {
    Redirect::to(&format!("{}?error={}", DASHBOARD_PATH, urlencoding::encode(message))).into_response()
}

fn dashboard_flag(flag: &str) -> Response {
    Redirect::to(&format!("{}?{}=true", DASHBOARD_PATH, flag)).into_response()
}

pub async fn create_user(State(state): State<AppState>, Form(form): Form<UserForm>) -> Response {
    let email = form.email.trim();
    if email.is_empty() || form.password.is_empty() {
        return dashboard_error("Email and password are required");
    }
    let traits = Traits::from_form(email, Some(form.first_name.as_str()), Some(form.last_name.as_str()));
    let req = CreateIdentityRequest::with_password(traits, &form.password);
    match state.kratos.create_identity(&req).await {
        Ok(identity) => {
            info!(target: "actions", id = %identity.id, "identity created");
            dashboard_flag("created")
        }
        Err(e) => {
            error!(target: "actions", "Error creating user: {}", e);
            if e.is_conflict() {
                dashboard_error("User with this email already exists")
            } else {
                dashboard_error("Failed to create user. Please try again.")
            }
        }
    }
}

pub async fn update_user(State(state): State<AppState>, Path(id): Path<String>, Form(form): Form<UserForm>) -> Response {
    let email = form.email.trim();
    if id.trim().is_empty() || email.is_empty() {
        return dashboard_error("User ID and email are required");
    }
    let traits = Traits::from_form(email, Some(form.first_name.as_str()), Some(form.last_name.as_str()));
    let req = UpdateIdentityRequest::traits_only(traits);
    match state.kratos.update_identity(&id, &req).await {
        Ok(_) => {
            info!(target: "actions", id = %id, "identity updated");
            dashboard_flag("updated")
        }
        Err(e) => {
            error!(target: "actions", "Error updating user: {}", e);
            if e.is_conflict() {
                dashboard_error("Another user with this email already exists")
            } else {
                dashboard_error("Failed to update user. Please try again.")
            }
        }
    }
}

pub async fn delete_user(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if id.trim().is_empty() {
        return dashboard_error("User ID is required");
    }
    match state.kratos.delete_identity(&id).await {
        Ok(()) => {
            info!(target: "actions", id = %id, "identity deleted");
            dashboard_flag("deleted")
        }
        Err(e) => {
            error!(target: "actions", "Error deleting user: {}", e);
            if e.is_not_found() {
                dashboard_error("User not found")
            } else {
                dashboard_error("Failed to delete user. Please try again.")
            }
        }
    }
}

/// New search criteria always start again at page 1.
pub async fn search(Form(form): Form<SearchForm>) -> Redirect {
    let query = ListQuery {
        page: 1,
        search: Some(form.search.trim().to_string()).filter(|s| !s.is_empty()),
        status: StatusFilter::parse_lenient(Some(form.status.as_str())),
    };
    Redirect::to(&query.dashboard_href(DASHBOARD_PATH))
}

pub async fn paginate(Form(form): Form<PaginateForm>) -> Redirect {
    let page = form.page.trim().parse::<u32>().ok().filter(|p| *p >= 1).unwrap_or(1);
    let query = ListQuery {
        page,
        search: Some(form.current_search.trim().to_string()).filter(|s| !s.is_empty()),
        status: StatusFilter::parse_lenient(Some(form.current_status.as_str())),
    };
    Redirect::to(&query.dashboard_href(DASHBOARD_PATH))
}
