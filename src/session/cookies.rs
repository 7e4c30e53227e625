use std::time::Duration;

use axum::http::header::COOKIE;
use axum::http::HeaderMap;

use crate::config::GateConfig;

/// Value of the named cookie from the request `Cookie` headers. Values are
/// percent-decoded; undecodable values are returned raw.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE).iter() {
        let Ok(s) = header.to_str() else { continue };
        for part in s.split(';') {
            let p = part.trim();
            if let Some((k, v)) = p.split_once('=') {
                if k.trim() == name {
                    let v = v.trim();
                    return Some(urlencoding::decode(v).map(|c| c.into_owned()).unwrap_or_else(|_| v.to_string()));
                }
            }
        }
    }
    None
}

/// The two cookies the gate cares about, as sent by the browser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCookies {
    pub token: Option<String>,
    pub last_activity: Option<String>,
}

impl SessionCookies {
    pub fn from_headers(headers: &HeaderMap, cfg: &GateConfig) -> Self {
        Self {
            token: cookie_value(headers, &cfg.session_cookie),
            last_activity: cookie_value(headers, &cfg.activity_cookie),
        }
    }

    /// The session token, treating an empty value as absent.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

/// `Set-Cookie` value for an HttpOnly, SameSite=Lax cookie scoped to `/`.
pub fn set_cookie(name: &str, value: &str, max_age: Duration, secure: bool) -> String {
    let mut out = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        name,
        urlencoding::encode(value),
        max_age.as_secs()
    );
    if secure {
        out.push_str("; Secure");
    }
    out
}

/// `Set-Cookie` value that deletes the named cookie.
pub fn clear_cookie(name: &str, secure: bool) -> String {
    let mut out = format!(
        "{}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Lax",
        name
    );
    if secure {
        out.push_str("; Secure");
    }
    out
}

/// Wall clock as epoch milliseconds, the unit of the activity cookie.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_named_cookies_across_headers() {
        let mut h = HeaderMap::new();
        h.append(COOKIE, HeaderValue::from_static("theme=dark; session-token=ory_st_abc"));
        h.append(COOKIE, HeaderValue::from_static("last-activity=1700000000000"));
        let c = SessionCookies::from_headers(&h, &GateConfig::default());
        assert_eq!(c.token(), Some("ory_st_abc"));
        assert_eq!(c.last_activity.as_deref(), Some("1700000000000"));
        assert_eq!(cookie_value(&h, "missing"), None);
    }

    #[test]
    fn empty_token_counts_as_absent() {
        let mut h = HeaderMap::new();
        h.insert(COOKIE, HeaderValue::from_static("session-token="));
        let c = SessionCookies::from_headers(&h, &GateConfig::default());
        assert_eq!(c.token.as_deref(), Some(""));
        assert_eq!(c.token(), None);
    }

    #[test]
    fn set_and_clear_flags() {
        let s = set_cookie("last-activity", "42", Duration::from_secs(2_592_000), true);
        assert_eq!(s, "last-activity=42; Path=/; Max-Age=2592000; HttpOnly; SameSite=Lax; Secure");
        let c = clear_cookie("session-token", false);
        assert!(c.starts_with("session-token=; Path=/; Max-Age=0;"));
        assert!(!c.contains("Secure"));
    }

    #[test]
    fn values_are_percent_encoded_and_decoded() {
        let s = set_cookie("session-token", "a b;c", Duration::from_secs(1), false);
        assert!(s.starts_with("session-token=a%20b%3Bc;"));
        let mut h = HeaderMap::new();
        h.insert(COOKIE, HeaderValue::from_static("session-token=a%20b%3Bc"));
        assert_eq!(cookie_value(&h, "session-token").as_deref(), Some("a b;c"));
    }
}
