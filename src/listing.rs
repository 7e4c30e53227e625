//! Search, status filtering and in-memory pagination for the identity table.
//!
//! The admin API has no search, so the dashboard pulls a page of identities and
//! narrows it here. Everything in this module is pure.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::kratos::Identity;

/// Buttons shown between the previous/next arrows.
pub const MAX_PAGE_BUTTONS: u32 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
    Verified,
    Unverified,
}

impl StatusFilter {
    pub const ALL: [StatusFilter; 5] =
        [StatusFilter::All, StatusFilter::Active, StatusFilter::Inactive, StatusFilter::Verified, StatusFilter::Unverified];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Active => "active",
            StatusFilter::Inactive => "inactive",
            StatusFilter::Verified => "verified",
            StatusFilter::Unverified => "unverified",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusFilter::All => "All Users",
            StatusFilter::Active => "Active",
            StatusFilter::Inactive => "Inactive",
            StatusFilter::Verified => "Verified",
            StatusFilter::Unverified => "Unverified",
        }
    }

    /// Lenient parse used for query strings: unknown values mean `all`.
    pub fn parse_lenient(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }

    pub fn matches(&self, identity: &Identity) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => identity.is_active(),
            StatusFilter::Inactive => !identity.is_active(),
            StatusFilter::Verified => identity.is_verified(),
            StatusFilter::Unverified => !identity.is_verified(),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "inactive" => Ok(StatusFilter::Inactive),
            "verified" => Ok(StatusFilter::Verified),
            "unverified" => Ok(StatusFilter::Unverified),
            other => Err(format!("unknown status filter '{}'", other)),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive substring match on email, first name or last name.
pub fn matches_search(identity: &Identity, term: &str) -> bool {
    let term = term.to_lowercase();
    let traits = &identity.traits;
    let hit = |s: Option<&str>| s.map(|v| v.to_lowercase().contains(&term)).unwrap_or(false);
    hit(Some(traits.email.as_str())) || hit(traits.first_name()) || hit(traits.last_name())
}

pub fn filter_identities(identities: Vec<Identity>, search: Option<&str>, status: StatusFilter) -> Vec<Identity> {
    let search = search.map(str::trim).filter(|s| !s.is_empty());
    identities
        .into_iter()
        .filter(|i| search.map(|t| matches_search(i, t)).unwrap_or(true))
        .filter(|i| status.matches(i))
        .collect()
}

/// Dashboard query string state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub search: Option<String>,
    pub status: StatusFilter,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self { page: 1, search: None, status: StatusFilter::All }
    }
}

impl ListQuery {
    /// Read `page`, `search` and `status`. Missing, zero or unparsable pages
    /// become 1; blank searches are dropped.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let page = params.get("page").and_then(|p| p.trim().parse::<u32>().ok()).filter(|p| *p >= 1).unwrap_or(1);
        let search = params.get("search").map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let status = StatusFilter::parse_lenient(params.get("status").map(String::as_str));
        Self { page, search, status }
    }

    pub fn with_page(&self, page: u32) -> Self {
        Self { page, ..self.clone() }
    }

    /// Encoded query string without the leading `?`. Leaves out an empty
    /// search and the `all` status.
    pub fn to_query_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(s) = self.search.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("search={}", urlencoding::encode(s)));
        }
        if self.status != StatusFilter::All {
            parts.push(format!("status={}", self.status.as_str()));
        }
        parts.push(format!("page={}", self.page));
        parts.join("&")
    }

    /// Dashboard location for this query.
    pub fn dashboard_href(&self, dashboard_path: &str) -> String {
        format!("{}?{}", dashboard_path, self.to_query_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

pub fn total_pages(total: usize, per_page: usize) -> u32 {
    if per_page == 0 { return 0; }
    total.div_ceil(per_page) as u32
}

/// Page buttons for `current` of `total` pages: all of them when they fit,
/// otherwise first/last with a window around the current page.
pub fn page_numbers(current: u32, total: u32) -> Vec<PageItem> {
    use PageItem::*;
    if total <= MAX_PAGE_BUTTONS {
        return (1..=total).map(Page).collect();
    }
    if current <= 3 {
        vec![Page(1), Page(2), Page(3), Page(4), Ellipsis, Page(total)]
    } else if current >= total - 2 {
        vec![Page(1), Ellipsis, Page(total - 3), Page(total - 2), Page(total - 1), Page(total)]
    } else {
        vec![Page(1), Ellipsis, Page(current - 1), Page(current), Page(current + 1), Ellipsis, Page(total)]
    }
}

/// One page of filtered rows plus what the pagination controls need.
#[derive(Debug, Clone)]
pub struct PageSlice<'a> {
    pub rows: &'a [Identity],
    pub current: u32,
    pub total_pages: u32,
    pub total: usize,
    /// 1-based index of the first row shown; 0 when empty.
    pub start_item: usize,
    pub end_item: usize,
}

impl PageSlice<'_> {
    pub fn has_previous(&self) -> bool { self.current > 1 }
    pub fn has_next(&self) -> bool { self.current < self.total_pages }
    /// Controls are hidden for a single page.
    pub fn show_controls(&self) -> bool { self.total_pages > 1 }
}

pub fn paginate(identities: &[Identity], page: u32, per_page: usize) -> PageSlice<'_> {
    let per_page = per_page.max(1);
    let total = identities.len();
    let pages = total_pages(total, per_page);
    let current = page.max(1);
    let start = ((current - 1) as usize).saturating_mul(per_page).min(total);
    let end = (start + per_page).min(total);
    PageSlice {
        rows: &identities[start..end],
        current,
        total_pages: pages,
        total,
        start_item: if start < end { start + 1 } else { 0 },
        end_item: end,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    pub active: usize,
    pub verified: usize,
    pub inactive: usize,
}

impl DashboardStats {
    pub fn from_identities(identities: &[Identity]) -> Self {
        Self {
            total: identities.len(),
            active: identities.iter().filter(|i| i.is_active()).count(),
            verified: identities.iter().filter(|i| i.is_verified()).count(),
            inactive: identities.iter().filter(|i| !i.is_active()).count(),
        }
    }
}
