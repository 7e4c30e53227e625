//!
//! kratos_dashboard HTTP server
//! ----------------------------
//! Axum router for the admin dashboard. Every request passes through the
//! session gate middleware before reaching a handler.
//!
//! Responsibilities:
//! - HTML pages: landing, login form and the identity dashboard.
//! - Form actions: login/logout and identity create/update/delete, plus the
//!   search and pagination redirects.
//! - JSON passthrough API under `/api/users`.
//! - Startup logging and listener setup.

use std::sync::Arc;

use anyhow::Context;
use axum::routing::{get, post};
use axum::{middleware, Router};
use tracing::info;

use crate::config::DashboardConfig;
use crate::kratos::KratosClient;
use crate::session::{session_gate, SessionGate, SessionValidator};

pub mod actions;
pub mod api;
pub mod pages;
pub mod views;

/// Shared server state injected into all handlers.
///
/// Cheap to clone: the configuration is behind an `Arc`, the identity service
/// client wraps a pooled `reqwest::Client`, and the gate holds `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DashboardConfig>,
    pub kratos: KratosClient,
    pub gate: SessionGate,
}

impl AppState {
    /// State whose gate validates sessions against the configured identity service.
    pub fn new(config: DashboardConfig) -> anyhow::Result<Self> {
        let kratos = KratosClient::from_config(&config).context("building identity service client")?;
        let validator: Arc<dyn SessionValidator> = Arc::new(kratos.clone());
        Ok(Self::assemble(config, kratos, validator))
    }

    /// State with a caller-supplied session validator.
    pub fn with_validator(config: DashboardConfig, validator: Arc<dyn SessionValidator>) -> anyhow::Result<Self> {
        let kratos = KratosClient::from_config(&config).context("building identity service client")?;
        Ok(Self::assemble(config, kratos, validator))
    }

    fn assemble(config: DashboardConfig, kratos: KratosClient, validator: Arc<dyn SessionValidator>) -> Self {
        let gate = SessionGate::new(config.gate.clone(), validator);
        Self { config: Arc::new(config), kratos, gate }
    }
}

/// Mount every route behind the session gate.
pub fn build_router(state: AppState) -> Router {
    let gate = state.gate.clone();
    Router::new()
        .route("/", get(pages::landing))
        .route("/login", get(pages::login).post(actions::login))
        .route("/logout", post(actions::logout))
        .route("/dashboard", get(pages::dashboard))
        .route("/dashboard/users", post(actions::create_user))
        .route("/dashboard/users/{id}/update", post(actions::update_user))
        .route("/dashboard/users/{id}/delete", post(actions::delete_user))
        .route("/dashboard/search", post(actions::search))
        .route("/dashboard/paginate", post(actions::paginate))
        .route("/api/users", get(api::list_users).post(api::create_user))
        .route("/api/users/{id}", get(api::get_user).put(api::update_user).delete(api::delete_user))
        .layer(middleware::from_fn_with_state(gate, session_gate))
        .with_state(state)
}

fn log_startup(config: &DashboardConfig) {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "startup",
        "kratos_dashboard starting: RUST_LOG='{}', listen={}, kratos_admin={}, kratos_public={}, production={}",
        rust_log,
        config.listen_addr(),
        config.kratos_admin_url,
        config.kratos_public_url,
        config.production
    );
    info!(
        target: "startup",
        "session gate: inactivity_timeout={}s, whoami_timeout={}ms, secure_cookies={}, per_page={}, fetch_page_size={}, fetch_max_pages={}",
        config.gate.inactivity_timeout.as_secs(),
        config.gate.remote_check_timeout.as_millis(),
        config.gate.secure_cookies,
        config.per_page,
        config.fetch_page_size,
        config.fetch_max_pages
    );
}

/// Start the dashboard on the configured address and serve until the process exits.
pub async fn run_with_config(config: DashboardConfig) -> anyhow::Result<()> {
    log_startup(&config);
    let addr = config.listen_addr();
    let state = AppState::new(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {}", addr))?;
    info!(target: "startup", "Starting server on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Convenience entry point reading configuration from the environment.
pub async fn run() -> anyhow::Result<()> {
    let config = DashboardConfig::from_env()?;
    run_with_config(config).await
}
