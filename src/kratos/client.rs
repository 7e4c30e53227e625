use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, LINK};
use reqwest::{redirect, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::KratosError;
use super::types::{
    CreateIdentityRequest, Identity, IdentityList, IdentityScan, LoginFlow, LoginResult, LoginSubmission, LogoutFlow,
    UpdateIdentityRequest, WhoAmI,
};
use crate::config::DashboardConfig;
use crate::listing::{filter_identities, StatusFilter};
use crate::tprintln;

/// Query for [`KratosClient::list_identities`]. Paging values go to the admin
/// API as-is; `search` and `status` are applied to the returned page.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    pub status: StatusFilter,
}

#[derive(Clone)]
pub struct KratosClient {
    admin_base: String,
    public_base: String,
    http: reqwest::Client,
}

impl KratosClient {
    pub fn new(admin_base: &str, public_base: &str, timeout: Duration) -> Result<Self, KratosError> {
        // Redirects are answers in their own right (logout replies with 303).
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self {
            admin_base: admin_base.trim_end_matches('/').to_string(),
            public_base: public_base.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_config(cfg: &DashboardConfig) -> Result<Self, KratosError> {
        Self::new(&cfg.kratos_admin_url, &cfg.kratos_public_url, cfg.request_timeout)
    }

    fn admin_url(&self, endpoint: &str) -> Result<Url, KratosError> {
        join_url(&self.admin_base, endpoint)
    }

    fn public_url(&self, endpoint: &str) -> Result<Url, KratosError> {
        join_url(&self.public_base, endpoint)
    }

    async fn send_checked(&self, req: RequestBuilder) -> Result<Response, KratosError> {
        let resp = req.header(ACCEPT, "application/json").send().await?;
        let status = resp.status();
        tprintln!("kratos {} -> {}", resp.url(), status);
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            debug!(target: "kratos", status = status.as_u16(), "kratos request rejected");
            return Err(KratosError::Api { status: status.as_u16(), body });
        }
        Ok(resp)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, KratosError> {
        let bytes = self.send_checked(req).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send_empty(&self, req: RequestBuilder) -> Result<(), KratosError> {
        let resp = req.header(ACCEPT, "application/json").send().await?;
        let status = resp.status();
        tprintln!("kratos {} -> {}", resp.url(), status);
        if status.is_success() || status.is_redirection() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(KratosError::Api { status: status.as_u16(), body })
    }

    /// List identities, then apply search and status filters to the page the
    /// admin API returned. `total_count` counts the filtered rows.
    pub async fn list_identities(&self, params: &ListParams) -> Result<IdentityList, KratosError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(p) = params.page { query.push(("page", p.to_string())); }
        if let Some(p) = params.per_page { query.push(("per_page", p.to_string())); }
        if let Some(p) = params.page_size { query.push(("page_size", p.to_string())); }
        let url = self.admin_url("/admin/identities")?;
        let identities: Vec<Identity> = self.send_json(self.http.get(url).query(&query)).await?;
        let filtered = filter_identities(identities, params.search.as_deref(), params.status);
        Ok(IdentityList { total_count: filtered.len(), identities: filtered })
    }

    /// Walk the admin listing with `page_size` rows per request, following the
    /// `Link: rel="next"` page token, until a short page, a page without a next
    /// link, or `max_pages` requests. Rows come back unfiltered.
    pub async fn list_all_identities(&self, page_size: u32, max_pages: usize) -> Result<IdentityScan, KratosError> {
        let page_size = page_size.max(1);
        let url = self.admin_url("/admin/identities")?;
        let mut scan = IdentityScan::default();
        let mut token: Option<String> = None;
        for fetched in 0..max_pages.max(1) {
            let mut query = vec![("page_size", page_size.to_string()), ("per_page", page_size.to_string())];
            if let Some(t) = &token {
                query.push(("page_token", t.clone()));
            }
            let resp = self.send_checked(self.http.get(url.clone()).query(&query)).await?;
            let next = resp
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(next_page_token);
            let bytes = resp.bytes().await?;
            let page: Vec<Identity> = serde_json::from_slice(&bytes)?;
            let short = page.len() < page_size as usize;
            scan.identities.extend(page);
            scan.pages = fetched + 1;
            match next {
                Some(n) if !short && token.as_deref() != Some(n.as_str()) => token = Some(n),
                _ => return Ok(scan),
            }
        }
        debug!(target: "kratos", pages = scan.pages, rows = scan.identities.len(), "identity listing stopped at page limit");
        scan.truncated = true;
        Ok(scan)
    }

    pub async fn get_identity(&self, id: &str) -> Result<Identity, KratosError> {
        let url = self.admin_url(&format!("/admin/identities/{}", urlencoding::encode(id)))?;
        self.send_json(self.http.get(url)).await
    }

    pub async fn create_identity(&self, req: &CreateIdentityRequest) -> Result<Identity, KratosError> {
        let url = self.admin_url("/admin/identities")?;
        self.send_json(self.http.post(url).json(req)).await
    }

    pub async fn update_identity(&self, id: &str, req: &UpdateIdentityRequest) -> Result<Identity, KratosError> {
        let url = self.admin_url(&format!("/admin/identities/{}", urlencoding::encode(id)))?;
        self.send_json(self.http.put(url).json(req)).await
    }

    pub async fn delete_identity(&self, id: &str) -> Result<(), KratosError> {
        let url = self.admin_url(&format!("/admin/identities/{}", urlencoding::encode(id)))?;
        self.send_empty(self.http.delete(url)).await
    }

    pub async fn initialize_login_flow(&self) -> Result<LoginFlow, KratosError> {
        let url = self.public_url("/self-service/login/api")?;
        self.send_json(self.http.get(url)).await
    }

    pub async fn submit_login(&self, flow_id: &str, submission: &LoginSubmission) -> Result<LoginResult, KratosError> {
        let url = self.public_url("/self-service/login")?;
        self.send_json(self.http.post(url).query(&[("flow", flow_id)]).json(submission)).await
    }

    pub async fn initialize_logout_flow(&self, session_token: &str) -> Result<LogoutFlow, KratosError> {
        let url = self.public_url("/self-service/logout/browser")?;
        self.send_json(self.http.get(url).header(AUTHORIZATION, bearer(session_token))).await
    }

    pub async fn submit_logout(&self, logout_token: &str) -> Result<(), KratosError> {
        let url = self.public_url("/self-service/logout")?;
        self.send_empty(self.http.get(url).query(&[("token", logout_token)])).await
    }

    /// Session lookup for a bearer token.
    pub async fn whoami(&self, session_token: &str) -> Result<WhoAmI, KratosError> {
        let url = self.public_url("/sessions/whoami")?;
        self.send_json(self.http.get(url).header(AUTHORIZATION, bearer(session_token))).await
    }
}

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// `page_token` of the `rel="next"` entry in a `Link` header.
fn next_page_token(link: &str) -> Option<String> {
    let entry = link.split(',').find(|part| part.contains("rel=\"next\""))?;
    let start = entry.find('<')? + 1;
    let end = entry.find('>')?;
    let target = entry.get(start..end)?;
    let url = Url::parse("http://link.invalid").ok()?.join(target).ok()?;
    let token = url.query_pairs().find(|(k, _)| k == "page_token").map(|(_, v)| v.into_owned());
    token.filter(|t| !t.is_empty())
}

fn join_url(base: &str, endpoint: &str) -> Result<Url, KratosError> {
    let raw = format!("{}{}", base, endpoint);
    Url::parse(&raw).map_err(|e| KratosError::InvalidUrl(format!("{}: {}", raw, e)))
}
