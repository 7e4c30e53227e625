//!
//! kratos_dashboard server binary
//! ------------------------------
//! Command-line entry point for the admin dashboard. Configuration comes from
//! environment variables; the flags below override them.

use anyhow::{Context, Result};
use std::env;

use kratos_dashboard::config::{parse_bool, DashboardConfig};

fn parse_port_arg(args: &[String], flag: &str) -> Option<u16> {
    arg_value(args, flag).and_then(|v| v.parse::<u16>().ok())
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag {
            return args.get(i + 1).filter(|v| !v.starts_with("--")).cloned();
        }
        i += 1;
    }
    None
}

/// `--production` alone enables; `--production false` disables.
fn parse_production_arg(args: &[String]) -> Option<bool> {
    if has_flag(args, "--development") {
        return Some(false);
    }
    if !has_flag(args, "--production") {
        return None;
    }
    match arg_value(args, "--production") {
        Some(v) => Some(parse_bool(&v).unwrap_or(true)),
        None => Some(true),
    }
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

const HELP: &str = "kratos_dashboard Server

USAGE:
  kratos_dashboard_server [--http-port N] [--bind ADDR] [--kratos-admin-url URL] [--kratos-public-url URL] [--production|--development]

OPTIONS:
  --http-port N              HTTP port (env: DASHBOARD_HTTP_PORT, default 3000)
  --bind ADDR                Listen address (env: DASHBOARD_BIND, default 0.0.0.0)
  --kratos-admin-url URL     Kratos admin API (env: KRATOS_ADMIN_URL, default http://localhost:4434)
  --kratos-public-url URL    Kratos public API (env: KRATOS_PUBLIC_URL, default http://localhost:4433)
  --production [bool]        Secure cookies (env: DASHBOARD_ENV=production). Presence enables.
  --development              Disable production mode explicitly.

Other settings: DASHBOARD_SESSION_TIMEOUT_SECS, DASHBOARD_WHOAMI_TIMEOUT_MS,
DASHBOARD_PER_PAGE, DASHBOARD_FETCH_PAGE_SIZE, DASHBOARD_FETCH_MAX_PAGES,
DASHBOARD_ASSET_PATTERN, RUST_LOG.
";

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("{}", HELP);
        return Ok(());
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    let mut config = DashboardConfig::from_env().context("reading configuration from environment")?;

    // CLI arguments override environment
    if let Some(port) = parse_port_arg(&args, "--http-port") {
        config.http_port = port;
    }
    if let Some(bind) = arg_value(&args, "--bind") {
        config.bind = bind;
    }
    if let Some(url) = arg_value(&args, "--kratos-admin-url") {
        config.kratos_admin_url = url;
    }
    if let Some(url) = arg_value(&args, "--kratos-public-url") {
        config.kratos_public_url = url;
    }
    if let Some(production) = parse_production_arg(&args) {
        config.set_production(production);
    }

    kratos_dashboard::server::run_with_config(config).await
}
