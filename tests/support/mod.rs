//! In-process stand-in for the Kratos admin and public APIs, plus helpers to
//! start the dashboard against it on ephemeral ports.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::header::{AUTHORIZATION, COOKIE, LINK, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use kratos_dashboard::config::DashboardConfig;
use kratos_dashboard::server::{build_router, AppState};

pub const GOOD_TOKEN: &str = "ory_st_good";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "correct horse";
pub const CSRF: &str = "csrf-123";
pub const LOGOUT_TOKEN: &str = "ory_lo_1";
pub const BAD_CREDENTIALS: &str = "The provided credentials are invalid, check for spelling mistakes in your password or username.";

#[derive(Clone, Default)]
pub struct FakeKratos {
    pub identities: Arc<Mutex<Vec<Value>>>,
    pub logouts: Arc<AtomicUsize>,
    pub whoami_calls: Arc<AtomicUsize>,
    pub list_requests: Arc<AtomicUsize>,
}

impl FakeKratos {
    pub fn count(&self) -> usize {
        self.identities.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn seed(&self, email: &str, first: &str, last: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let ident = identity_json(&id, &json!({ "email": email, "name": { "first": first, "last": last } }));
        self.identities.lock().expect("lock").push(ident);
        id
    }

    /// Store an identity with arbitrary traits, as another tool might write it.
    pub fn seed_traits(&self, traits: Value) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.identities.lock().expect("lock").push(identity_json(&id, &traits));
        id
    }

    pub fn find_by_email(&self, email: &str) -> Option<Value> {
        self.identities.lock().ok()?.iter().find(|i| i["traits"]["email"] == email).cloned()
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/admin/identities", get(list_identities).post(create_identity))
            .route(
                "/admin/identities/{id}",
                get(get_identity).put(update_identity).delete(delete_identity),
            )
            .route("/self-service/login/api", get(init_login))
            .route("/self-service/login", axum::routing::post(submit_login))
            .route("/self-service/logout/browser", get(init_logout))
            .route("/self-service/logout", get(submit_logout))
            .route("/sessions/whoami", get(whoami))
            .with_state(self.clone())
    }
}

fn identity_json(id: &str, traits: &Value) -> Value {
    json!({
        "id": id,
        "schema_id": "default",
        "state": "active",
        "traits": traits,
        "verifiable_addresses": [{
            "id": uuid::Uuid::new_v4().to_string(),
            "value": traits["email"],
            "verified": false,
            "via": "email",
            "status": "pending"
        }],
        "recovery_addresses": [],
        "created_at": "2025-01-02T03:04:05Z",
        "updated_at": "2025-01-02T03:04:05Z"
    })
}

fn kratos_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": { "code": status.as_u16(), "message": message } }))).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ")
}

/// Keyset-style paging as Kratos does it: `page_size` rows from the offset in
/// `page_token`, with a `Link: rel="next"` header while rows remain.
async fn list_identities(State(k): State<FakeKratos>, Query(q): Query<HashMap<String, String>>) -> Response {
    k.list_requests.fetch_add(1, Ordering::SeqCst);
    let ids = k.identities.lock().map(|v| v.clone()).unwrap_or_default();
    let size = q.get("page_size").and_then(|v| v.parse::<usize>().ok()).unwrap_or(250).max(1);
    let offset = q.get("page_token").and_then(|v| v.parse::<usize>().ok()).unwrap_or(0);
    let page: Vec<Value> = ids.iter().skip(offset).take(size).cloned().collect();
    let mut headers = HeaderMap::new();
    if offset + size < ids.len() {
        let link = format!(
            "</admin/identities?page_size={size}&page_token=0>; rel=\"first\",</admin/identities?page_size={size}&page_token={}>; rel=\"next\"",
            offset + size
        );
        if let Ok(v) = link.parse() {
            headers.insert(LINK, v);
        }
    }
    (headers, Json(Value::Array(page))).into_response()
}

async fn create_identity(State(k): State<FakeKratos>, Json(body): Json<Value>) -> Response {
    let email = body["traits"]["email"].as_str().unwrap_or_default().to_string();
    let mut ids = k.identities.lock().expect("lock");
    if ids.iter().any(|i| i["traits"]["email"] == email) {
        return kratos_error(StatusCode::CONFLICT, "An identity with the same identifier already exists.");
    }
    let ident = identity_json(&uuid::Uuid::new_v4().to_string(), &body["traits"]);
    ids.push(ident.clone());
    (StatusCode::CREATED, Json(ident)).into_response()
}

async fn get_identity(State(k): State<FakeKratos>, Path(id): Path<String>) -> Response {
    let ids = k.identities.lock().expect("lock");
    match ids.iter().find(|i| i["id"] == id) {
        Some(i) => Json(i.clone()).into_response(),
        None => kratos_error(StatusCode::NOT_FOUND, "Unable to locate the resource"),
    }
}

async fn update_identity(State(k): State<FakeKratos>, Path(id): Path<String>, Json(body): Json<Value>) -> Response {
    let email = body["traits"]["email"].clone();
    let mut ids = k.identities.lock().expect("lock");
    if ids.iter().any(|i| i["id"] != id && i["traits"]["email"] == email) {
        return kratos_error(StatusCode::CONFLICT, "An identity with the same identifier already exists.");
    }
    match ids.iter_mut().find(|i| i["id"] == id) {
        Some(i) => {
            i["traits"] = body["traits"].clone();
            Json(i.clone()).into_response()
        }
        None => kratos_error(StatusCode::NOT_FOUND, "Unable to locate the resource"),
    }
}

async fn delete_identity(State(k): State<FakeKratos>, Path(id): Path<String>) -> Response {
    let mut ids = k.identities.lock().expect("lock");
    let before = ids.len();
    ids.retain(|i| i["id"] != id);
    if ids.len() == before {
        kratos_error(StatusCode::NOT_FOUND, "Unable to locate the resource")
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

async fn init_login() -> Json<Value> {
    Json(json!({
        "id": "flow-1",
        "type": "api",
        "ui": {
            "action": "http://kratos/self-service/login?flow=flow-1",
            "method": "POST",
            "nodes": [
                { "type": "input", "group": "default", "attributes": { "name": "csrf_token", "type": "hidden", "value": CSRF } },
                { "type": "input", "group": "default", "attributes": { "name": "identifier", "type": "text", "value": "" } }
            ],
            "messages": []
        }
    }))
}

async fn submit_login(Query(q): Query<HashMap<String, String>>, Json(body): Json<Value>) -> Response {
    let ok = q.get("flow").map(String::as_str) == Some("flow-1")
        && body["method"] == "password"
        && body["identifier"] == ADMIN_EMAIL
        && body["password"] == ADMIN_PASSWORD
        && body["csrf_token"] == CSRF;
    if ok {
        return Json(json!({
            "session_token": GOOD_TOKEN,
            "session": { "id": "sess-1", "active": true }
        }))
        .into_response();
    }
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "id": "flow-1",
            "ui": { "nodes": [], "messages": [ { "id": 4000006, "type": "error", "text": BAD_CREDENTIALS } ] }
        })),
    )
        .into_response()
}

async fn whoami(State(k): State<FakeKratos>, headers: HeaderMap) -> Response {
    k.whoami_calls.fetch_add(1, Ordering::SeqCst);
    if bearer(&headers) == Some(GOOD_TOKEN) {
        Json(json!({ "id": "sess-1", "active": true })).into_response()
    } else {
        kratos_error(StatusCode::UNAUTHORIZED, "No valid session credentials found in the request.")
    }
}

async fn init_logout(headers: HeaderMap) -> Response {
    if bearer(&headers) == Some(GOOD_TOKEN) {
        Json(json!({
            "logout_token": LOGOUT_TOKEN,
            "logout_url": format!("http://kratos/self-service/logout?token={}", LOGOUT_TOKEN)
        }))
        .into_response()
    } else {
        kratos_error(StatusCode::UNAUTHORIZED, "No valid session credentials found in the request.")
    }
}

async fn submit_logout(State(k): State<FakeKratos>, Query(q): Query<HashMap<String, String>>) -> Response {
    if q.get("token").map(String::as_str) == Some(LOGOUT_TOKEN) {
        k.logouts.fetch_add(1, Ordering::SeqCst);
        StatusCode::NO_CONTENT.into_response()
    } else {
        kratos_error(StatusCode::BAD_REQUEST, "unknown logout token")
    }
}

/// Serve `router` on an ephemeral localhost port and return its base URL.
pub async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.expect("bind 127.0.0.1:0");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            eprintln!("test server error: {e:?}");
        }
    });
    format!("http://{}", addr)
}

pub async fn start_kratos() -> (FakeKratos, String) {
    let kratos = FakeKratos::default();
    let base = spawn(kratos.router()).await;
    (kratos, base)
}

pub fn test_config(kratos_base: &str) -> DashboardConfig {
    DashboardConfig {
        kratos_admin_url: kratos_base.to_string(),
        kratos_public_url: kratos_base.to_string(),
        ..DashboardConfig::default()
    }
}

pub async fn start_dashboard(state: AppState) -> String {
    spawn(build_router(state)).await
}

/// Fake identity service plus a dashboard wired to it.
pub async fn start_stack() -> (FakeKratos, String) {
    start_stack_with(|_| {}).await
}

/// Like [`start_stack`], with a chance to adjust the dashboard configuration.
pub async fn start_stack_with<F: FnOnce(&mut DashboardConfig)>(adjust: F) -> (FakeKratos, String) {
    let (kratos, kratos_base) = start_kratos().await;
    let mut config = test_config(&kratos_base);
    adjust(&mut config);
    let state = AppState::new(config).expect("app state");
    let base = start_dashboard(state).await;
    (kratos, base)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("reqwest client")
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// `Cookie` header carrying a session token and an activity stamp `idle_ms` old.
pub fn session_cookie_header(token: &str, idle_ms: i64) -> (reqwest::header::HeaderName, String) {
    (COOKIE, format!("session-token={}; last-activity={}", token, now_ms() - idle_ms))
}

pub fn set_cookies(resp: &reqwest::Response) -> Vec<String> {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

pub fn set_cookie_named<'a>(cookies: &'a [String], name: &str) -> Option<&'a String> {
    let prefix = format!("{}=", name);
    cookies.iter().find(|c| c.starts_with(&prefix))
}

pub fn location(resp: &reqwest::Response) -> String {
    resp.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
