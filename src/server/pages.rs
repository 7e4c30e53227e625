use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::response::Html;
use tracing::{error, warn};

use super::views::{self, DashboardView, Flash};
use super::AppState;
use crate::kratos::Identity;
use crate::listing::{filter_identities, paginate, DashboardStats, ListQuery};

const CONNECTION_ERROR: &str = "Failed to load users. Please check your Kratos connection.";

pub async fn landing() -> Html<String> {
    Html(views::landing_page())
}

/// The gate has already sent signed-in callers elsewhere; `error` and `email`
/// let a redirect prefill the form.
pub async fn login(Query(params): Query<HashMap<String, String>>) -> Html<String> {
    let error = params.get("error").map(String::as_str).filter(|e| !e.is_empty());
    Html(views::login_page(error, params.get("email").map(String::as_str)))
}

pub async fn dashboard(State(state): State<AppState>, Query(params): Query<HashMap<String, String>>) -> Html<String> {
    let query = ListQuery::from_params(&params);
    let flash = flash_from_params(&params);

    let page_size = u32::try_from(state.config.fetch_page_size).unwrap_or(u32::MAX);
    let scan = state.kratos.list_all_identities(page_size, state.config.fetch_max_pages).await;
    let (identities, loaded_limit, connection_error): (Vec<Identity>, Option<usize>, Option<&str>) = match scan {
        Ok(scan) => {
            let limit = scan.truncated.then_some(scan.identities.len());
            if let Some(n) = limit {
                warn!(target: "dashboard", loaded = n, pages = scan.pages, "identity listing truncated at page limit");
            }
            (filter_identities(scan.identities, query.search.as_deref(), query.status), limit, None)
        }
        Err(e) => {
            error!(target: "dashboard", "Failed to fetch users: {}", e);
            (Vec::new(), None, Some(CONNECTION_ERROR))
        }
    };

    let view = DashboardView {
        query: &query,
        stats: DashboardStats::from_identities(&identities),
        slice: paginate(&identities, query.page, state.config.per_page),
        flash: &flash,
        connection_error,
        loaded_limit,
    };
    Html(views::dashboard_page(&view))
}

pub(crate) fn flash_from_params(params: &HashMap<String, String>) -> Flash {
    let flag = |k: &str| params.get(k).map(|v| v == "true").unwrap_or(false);
    Flash {
        created: flag("created"),
        updated: flag("updated"),
        deleted: flag("deleted"),
        error: params.get("error").cloned().filter(|e| !e.is_empty()),
    }
}
