//! Runtime configuration for the dashboard server and its session gate.
//!
//! Values come from environment variables with defaults; the server binary lets
//! command-line flags override them. Nothing here is global: the gate and the
//! handlers receive their configuration at construction.

use std::time::Duration;

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

pub const DEFAULT_HTTP_PORT: u16 = 3000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_KRATOS_ADMIN_URL: &str = "http://localhost:4434";
pub const DEFAULT_KRATOS_PUBLIC_URL: &str = "http://localhost:4433";
pub const DEFAULT_PER_PAGE: usize = 20;
pub const DEFAULT_FETCH_PAGE_SIZE: usize = 250;
pub const DEFAULT_FETCH_MAX_PAGES: usize = 40;

/// Static assets and anything that looks like a file name skip the gate.
pub const DEFAULT_ASSET_PATTERN: &str = r"^/(static|assets)/|\.";

static DEFAULT_ASSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEFAULT_ASSET_PATTERN).expect("default asset pattern compiles"));

const THIRTY_DAYS: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Settings consumed by [`crate::session::SessionGate`].
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Cookie carrying the identity service session token.
    pub session_cookie: String,
    /// Cookie carrying the last protected access as epoch milliseconds.
    pub activity_cookie: String,
    /// A session idle for this long or longer is expired.
    pub inactivity_timeout: Duration,
    /// Max-Age written with every activity refresh. Deliberately far longer
    /// than `inactivity_timeout`.
    pub activity_cookie_max_age: Duration,
    /// Upper bound on the whoami round trip.
    pub remote_check_timeout: Duration,
    pub login_path: String,
    pub protected_root: String,
    pub protected_prefix: String,
    pub api_prefix: String,
    pub asset_pattern: Regex,
    pub secure_cookies: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            session_cookie: "session-token".to_string(),
            activity_cookie: "last-activity".to_string(),
            inactivity_timeout: Duration::from_secs(30 * 60),
            activity_cookie_max_age: THIRTY_DAYS,
            remote_check_timeout: Duration::from_millis(5000),
            login_path: "/login".to_string(),
            protected_root: "/".to_string(),
            protected_prefix: "/dashboard".to_string(),
            api_prefix: "/api".to_string(),
            asset_pattern: DEFAULT_ASSET_RE.clone(),
            secure_cookies: false,
        }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub bind: String,
    pub http_port: u16,
    pub kratos_admin_url: String,
    pub kratos_public_url: String,
    /// Production mode marks every cookie `Secure`.
    pub production: bool,
    /// Rows per dashboard page.
    pub per_page: usize,
    /// Rows per admin API request when the dashboard walks the identity list
    /// before filtering and paging in memory.
    pub fetch_page_size: usize,
    /// Upper bound on admin API requests per dashboard render.
    pub fetch_max_pages: usize,
    /// Timeout applied to every identity service request.
    pub request_timeout: Duration,
    pub gate: GateConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            kratos_admin_url: DEFAULT_KRATOS_ADMIN_URL.to_string(),
            kratos_public_url: DEFAULT_KRATOS_PUBLIC_URL.to_string(),
            production: false,
            per_page: DEFAULT_PER_PAGE,
            fetch_page_size: DEFAULT_FETCH_PAGE_SIZE,
            fetch_max_pages: DEFAULT_FETCH_MAX_PAGES,
            request_timeout: Duration::from_secs(10),
            gate: GateConfig::default(),
        }
    }
}

impl DashboardConfig {
    /// Build configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup. Unparsable
    /// numeric values fall back to their defaults with a warning; an invalid
    /// asset pattern is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = DashboardConfig::default();

        if let Some(port) = parse_env_num::<u16, _>(&lookup, "DASHBOARD_HTTP_PORT") {
            cfg.http_port = port;
        }
        if let Some(bind) = lookup("DASHBOARD_BIND").filter(|s| !s.trim().is_empty()) {
            cfg.bind = bind.trim().to_string();
        }
        if let Some(url) = lookup("KRATOS_ADMIN_URL").filter(|s| !s.trim().is_empty()) {
            cfg.kratos_admin_url = url.trim().to_string();
        }
        if let Some(url) = lookup("KRATOS_PUBLIC_URL").filter(|s| !s.trim().is_empty()) {
            cfg.kratos_public_url = url.trim().to_string();
        }
        if let Some(env) = lookup("DASHBOARD_ENV") {
            cfg.set_production(env.trim().eq_ignore_ascii_case("production"));
        }
        if let Some(secs) = parse_env_num::<u64, _>(&lookup, "DASHBOARD_SESSION_TIMEOUT_SECS") {
            cfg.gate.inactivity_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_env_num::<u64, _>(&lookup, "DASHBOARD_WHOAMI_TIMEOUT_MS") {
            cfg.gate.remote_check_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = parse_env_num::<usize, _>(&lookup, "DASHBOARD_PER_PAGE") {
            cfg.per_page = n.max(1);
        }
        if let Some(n) = parse_env_num::<usize, _>(&lookup, "DASHBOARD_FETCH_PAGE_SIZE") {
            cfg.fetch_page_size = n.max(1);
        }
        if let Some(n) = parse_env_num::<usize, _>(&lookup, "DASHBOARD_FETCH_MAX_PAGES") {
            cfg.fetch_max_pages = n.max(1);
        }
        if let Some(pat) = lookup("DASHBOARD_ASSET_PATTERN").filter(|s| !s.is_empty()) {
            cfg.gate.asset_pattern = Regex::new(&pat)
                .map_err(|e| anyhow!("invalid DASHBOARD_ASSET_PATTERN '{}': {}", pat, e))?;
        }
        Ok(cfg)
    }

    /// Toggle production mode, keeping the gate's cookie flags in step.
    pub fn set_production(&mut self, production: bool) {
        self.production = production;
        self.gate.secure_cookies = production;
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.http_port)
    }
}

fn parse_env_num<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(target: "startup", "ignoring unparsable {}='{}'", name, raw);
            None
        }
    }
}

/// Parse the usual truthy/falsy spellings.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
