mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;

use kratos_dashboard::server::AppState;
use kratos_dashboard::session::{SessionCheck, SessionValidator};
use support::*;

const MINUTE_MS: i64 = 60 * 1000;

fn assert_cleared(cookies: &[String]) {
    for name in ["session-token", "last-activity"] {
        let c = set_cookie_named(cookies, name).unwrap_or_else(|| panic!("{} not cleared: {:?}", name, cookies));
        assert!(c.contains("Max-Age=0"), "{}", c);
    }
}

#[tokio::test]
async fn protected_routes_without_token_redirect_to_login() -> Result<()> {
    let (kratos, base) = start_stack().await;
    let http = client();
    for path in ["/", "/dashboard", "/dashboard?page=2"] {
        let resp = http.get(format!("{}{}", base, path)).send().await?;
        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT, "path {}", path);
        assert_eq!(location(&resp), "/login");
        assert_cleared(&set_cookies(&resp));
    }
    assert_eq!(kratos.whoami_calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn valid_session_is_allowed_and_activity_refreshed() -> Result<()> {
    let (_kratos, base) = start_stack().await;
    let (name, value) = session_cookie_header(GOOD_TOKEN, 5 * MINUTE_MS);
    let before = now_ms();
    let resp = client().get(format!("{}/dashboard", base)).header(name, value).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookies = set_cookies(&resp);
    let touched = set_cookie_named(&cookies, "last-activity").expect("activity cookie refreshed");
    assert!(touched.contains("Max-Age=2592000"), "{}", touched);
    assert!(touched.contains("HttpOnly") && touched.contains("SameSite=Lax"));
    let stamp: i64 = touched
        .trim_start_matches("last-activity=")
        .split(';')
        .next()
        .unwrap_or_default()
        .parse()?;
    assert!(stamp >= before);
    assert!(set_cookie_named(&cookies, "session-token").is_none());
    assert!(resp.text().await?.contains("User Management"));
    Ok(())
}

#[tokio::test]
async fn idle_session_redirects_even_when_remote_accepts() -> Result<()> {
    let (_kratos, base) = start_stack().await;
    let (name, value) = session_cookie_header(GOOD_TOKEN, 31 * MINUTE_MS);
    let resp = client().get(format!("{}/dashboard", base)).header(name, value).send().await?;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/login");
    assert_cleared(&set_cookies(&resp));
    Ok(())
}

#[tokio::test]
async fn rejected_token_redirects_to_login() -> Result<()> {
    let (kratos, base) = start_stack().await;
    let (name, value) = session_cookie_header("ory_st_revoked", MINUTE_MS);
    let resp = client().get(format!("{}/", base)).header(name, value).send().await?;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/login");
    assert_cleared(&set_cookies(&resp));
    assert_eq!(kratos.whoami_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn login_page_redirects_signed_in_callers() -> Result<()> {
    let (_kratos, base) = start_stack().await;
    let http = client();

    let resp = http.get(format!("{}/login", base)).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await?.contains("name=\"remember-me\""));

    let (name, value) = session_cookie_header(GOOD_TOKEN, 5 * MINUTE_MS);
    let resp = http.get(format!("{}/login", base)).header(name, value).send().await?;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/");

    let (name, value) = session_cookie_header("ory_st_revoked", 5 * MINUTE_MS);
    let resp = http.get(format!("{}/login", base)).header(name, value).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn assets_and_api_skip_the_gate() -> Result<()> {
    let (kratos, base) = start_stack().await;
    let http = client();

    let resp = http.get(format!("{}/favicon.ico", base)).send().await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(set_cookies(&resp).is_empty());

    let resp = http.get(format!("{}/api/users", base)).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);

    assert_eq!(kratos.whoami_calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn unreachable_identity_service_fails_closed() -> Result<()> {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await?;
    let dead = format!("http://{}", listener.local_addr()?);
    drop(listener);

    let state = AppState::new(test_config(&dead))?;
    let base = start_dashboard(state).await;
    let (name, value) = session_cookie_header(GOOD_TOKEN, MINUTE_MS);
    let resp = client().get(format!("{}/dashboard", base)).header(name, value).send().await?;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/login");
    Ok(())
}

struct AlwaysValid;

#[async_trait]
impl SessionValidator for AlwaysValid {
    async fn check_session(&self, _token: &str) -> SessionCheck {
        SessionCheck::Valid
    }
}

#[tokio::test]
async fn dashboard_shows_connection_error_when_listing_fails() -> Result<()> {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await?;
    let dead = format!("http://{}", listener.local_addr()?);
    drop(listener);

    let state = AppState::with_validator(test_config(&dead), Arc::new(AlwaysValid))?;
    let base = start_dashboard(state).await;
    let (name, value) = session_cookie_header("anything", MINUTE_MS);
    let resp = client().get(format!("{}/dashboard", base)).header(name, value).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await?;
    assert!(body.contains("Connection Error"));
    assert!(body.contains("Please check your Kratos connection."));
    Ok(())
}
