use crate::config::GateConfig;

/// What the gate does with a path. Exactly one class applies to any path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Assets, the API namespace and unknown public paths. No session logic.
    Bypass,
    LoginPage,
    Protected,
}

/// Classify a request path. First match wins: assets and the API prefix,
/// then the login page, then the protected root or prefix, else bypass.
pub fn classify(path: &str, cfg: &GateConfig) -> RouteClass {
    if cfg.asset_pattern.is_match(path) || path.starts_with(cfg.api_prefix.as_str()) {
        return RouteClass::Bypass;
    }
    if path == cfg.login_path {
        return RouteClass::LoginPage;
    }
    if path == cfg.protected_root || path.starts_with(cfg.protected_prefix.as_str()) {
        return RouteClass::Protected;
    }
    RouteClass::Bypass
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_table() {
        let cfg = GateConfig::default();
        let cases = [
            ("/favicon.ico", RouteClass::Bypass),
            ("/static/app.css", RouteClass::Bypass),
            ("/assets/logo", RouteClass::Bypass),
            ("/dashboard/report.csv", RouteClass::Bypass),
            ("/api/users", RouteClass::Bypass),
            ("/api", RouteClass::Bypass),
            ("/health", RouteClass::Bypass),
            ("/logout", RouteClass::Bypass),
            ("/login", RouteClass::LoginPage),
            ("/login/", RouteClass::Bypass),
            ("/", RouteClass::Protected),
            ("/dashboard", RouteClass::Protected),
            ("/dashboard/users/abc/delete", RouteClass::Protected),
        ];
        for (path, want) in cases {
            assert_eq!(classify(path, &cfg), want, "path {}", path);
        }
    }

    #[test]
    fn api_prefix_beats_protected_prefix() {
        let cfg = GateConfig { api_prefix: "/dashboard/api".into(), ..GateConfig::default() };
        assert_eq!(classify("/dashboard/api/users", &cfg), RouteClass::Bypass);
        assert_eq!(classify("/dashboard/users", &cfg), RouteClass::Protected);
    }
}
