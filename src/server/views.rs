//! Plain HTML rendering for the landing, login and dashboard pages.
//!
//! Every interpolated value goes through [`escape`]. Markup is deliberately
//! bare: no styling, no scripts, just forms that post to the action routes.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::kratos::Identity;
use crate::listing::{page_numbers, DashboardStats, ListQuery, PageItem, PageSlice, StatusFilter};

pub const DASHBOARD_PATH: &str = "/dashboard";

/// HTML-escape text for element content and double-quoted attributes.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `Oct 19, 2026, 14:05` in UTC; `-` when the identity service sent no date.
pub fn format_date(ts: Option<&DateTime<Utc>>) -> String {
    match ts {
        Some(t) => t.format("%b %-d, %Y, %H:%M").to_string(),
        None => "-".to_string(),
    }
}

/// First eight characters of an identity id, for the table.
pub fn short_id(id: &str) -> String {
    let head: String = id.chars().take(8).collect();
    format!("{}...", head)
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape(title),
        body
    )
}

pub fn landing_page() -> String {
    let body = "<h1>Kratos Dashboard</h1>\n\
<p>Admin interface for Ory Kratos identity management</p>\n\
<p><a href=\"/dashboard\">Go to Dashboard</a></p>\n\
<ul>\n<li>User management (create, update, delete)</li>\n<li>Search and status filters</li>\n<li>User statistics</li>\n<li>Identity verification status</li>\n</ul>\n";
    layout("Kratos Dashboard", body)
}

pub fn login_page(error: Option<&str>, email: Option<&str>) -> String {
    let mut body = String::from("<h1>Sign in</h1>\n<p>Kratos Dashboard administration</p>\n");
    if let Some(err) = error {
        let _ = writeln!(body, "<p role=\"alert\" class=\"error\">{}</p>", escape(err));
    }
    let _ = write!(
        body,
        "<form method=\"post\" action=\"/login\">\n\
<label>Email <input type=\"email\" name=\"email\" value=\"{}\" required></label>\n\
<label>Password <input type=\"password\" name=\"password\" required></label>\n\
<label><input type=\"checkbox\" name=\"remember-me\"> Remember me</label>\n\
<button type=\"submit\">Sign in</button>\n\
</form>\n",
        escape(email.unwrap_or(""))
    );
    layout("Sign in - Kratos Dashboard", &body)
}

/// Query flags the action handlers leave behind after a redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flash {
    pub created: bool,
    pub updated: bool,
    pub deleted: bool,
    pub error: Option<String>,
}

impl Flash {
    fn messages(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if self.created { out.push(("notice", "User created successfully".to_string())); }
        if self.updated { out.push(("notice", "User updated successfully".to_string())); }
        if self.deleted { out.push(("notice", "User deleted successfully".to_string())); }
        if let Some(e) = self.error.as_deref().filter(|e| !e.is_empty()) {
            out.push(("error", e.to_string()));
        }
        out
    }
}

/// Everything the dashboard page shows.
pub struct DashboardView<'a> {
    pub query: &'a ListQuery,
    pub stats: DashboardStats,
    pub slice: PageSlice<'a>,
    pub flash: &'a Flash,
    /// Set when the identity service could not be reached.
    pub connection_error: Option<&'a str>,
    /// Rows loaded when the listing walk stopped at its page limit.
    pub loaded_limit: Option<usize>,
}

pub fn dashboard_page(view: &DashboardView<'_>) -> String {
    let mut body = String::new();
    body.push_str("<h1>User Management</h1>\n<p>Manage user identities through Ory Kratos</p>\n");
    body.push_str("<form method=\"post\" action=\"/logout\"><button type=\"submit\">Sign out</button></form>\n");
    // Bulk import is not wired up.
    body.push_str("<button type=\"button\" disabled>Import CSV</button>\n");

    for (class, msg) in view.flash.messages() {
        let _ = writeln!(body, "<p role=\"status\" class=\"{}\">{}</p>", class, escape(&msg));
    }
    if let Some(err) = view.connection_error {
        let _ = writeln!(
            body,
            "<section class=\"error\">\n<h3>Connection Error</h3>\n<p>{}</p>\n</section>",
            escape(err)
        );
    }

    if let Some(n) = view.loaded_limit {
        let _ = writeln!(
            body,
            "<p role=\"status\" class=\"warning\">Results truncated: only the first {} identities were loaded. Narrow the search to find others.</p>",
            n
        );
    }

    render_stats(&mut body, &view.stats);
    render_search(&mut body, view.query);
    render_create_form(&mut body);

    let heading = match view.query.search.as_deref() {
        Some(s) => format!("Users (filtered by \"{}\")", escape(s)),
        None => "Users".to_string(),
    };
    let _ = writeln!(body, "<h2>{}</h2>\n<p>{} total users</p>", heading, view.slice.total);
    render_table(&mut body, view.slice.rows);
    render_pagination(&mut body, &view.slice, view.query);

    layout("Dashboard - Kratos Dashboard", &body)
}

fn render_stats(body: &mut String, stats: &DashboardStats) {
    let _ = writeln!(
        body,
        "<dl class=\"stats\">\n<dt>Total Users</dt><dd>{}</dd>\n<dt>Active Users</dt><dd>{}</dd>\n<dt>Verified</dt><dd>{}</dd>\n<dt>Inactive</dt><dd>{}</dd>\n</dl>",
        stats.total, stats.active, stats.verified, stats.inactive
    );
}

fn render_search(body: &mut String, query: &ListQuery) {
    body.push_str("<form method=\"post\" action=\"/dashboard/search\">\n");
    let _ = writeln!(
        body,
        "<label>Search <input type=\"search\" name=\"search\" value=\"{}\" placeholder=\"Search by email or name\"></label>",
        escape(query.search.as_deref().unwrap_or(""))
    );
    body.push_str("<label>Status <select name=\"status\">\n");
    for s in StatusFilter::ALL {
        let selected = if s == query.status { " selected" } else { "" };
        let _ = writeln!(body, "<option value=\"{}\"{}>{}</option>", s.as_str(), selected, s.label());
    }
    body.push_str("</select></label>\n<button type=\"submit\">Apply</button>\n</form>\n");
}

fn render_create_form(body: &mut String) {
    body.push_str(
        "<details>\n<summary>Add User</summary>\n\
<form method=\"post\" action=\"/dashboard/users\">\n\
<label>Email <input type=\"email\" name=\"email\" required></label>\n\
<label>First name <input type=\"text\" name=\"firstName\"></label>\n\
<label>Last name <input type=\"text\" name=\"lastName\"></label>\n\
<label>Password <input type=\"password\" name=\"password\" required></label>\n\
<button type=\"submit\">Create User</button>\n\
</form>\n</details>\n",
    );
}

fn render_table(body: &mut String, rows: &[Identity]) {
    body.push_str("<table>\n<thead><tr><th>ID</th><th>Email</th><th>First Name</th><th>Last Name</th><th>Status</th><th>Created At</th><th>Actions</th></tr></thead>\n<tbody>\n");
    if rows.is_empty() {
        body.push_str("<tr><td colspan=\"7\">No users found</td></tr>\n");
    }
    for ident in rows {
        let id = escape(&ident.id);
        let path_id = urlencoding::encode(&ident.id);
        let _ = writeln!(
            body,
            "<tr><td title=\"{}\">{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>",
            id,
            escape(&short_id(&ident.id)),
            escape(&ident.traits.email),
            escape(ident.traits.first_name().unwrap_or("-")),
            escape(ident.traits.last_name().unwrap_or("-")),
            ident.state.as_str(),
            format_date(ident.created_at.as_ref()),
        );
        let _ = writeln!(
            body,
            "<form method=\"post\" action=\"/dashboard/users/{}/update\">\
<input type=\"email\" name=\"email\" value=\"{}\" required>\
<input type=\"text\" name=\"firstName\" value=\"{}\">\
<input type=\"text\" name=\"lastName\" value=\"{}\">\
<button type=\"submit\">Update</button></form>",
            path_id,
            escape(&ident.traits.email),
            escape(ident.traits.first_name().unwrap_or("")),
            escape(ident.traits.last_name().unwrap_or("")),
        );
        let _ = writeln!(
            body,
            "<form method=\"post\" action=\"/dashboard/users/{}/delete\"><button type=\"submit\">Delete</button></form></td></tr>",
            path_id
        );
    }
    body.push_str("</tbody>\n</table>\n");
}

fn page_button(body: &mut String, query: &ListQuery, page: u32, label: &str, current: bool) {
    let _ = write!(body, "<form method=\"post\" action=\"/dashboard/paginate\">");
    let _ = write!(body, "<input type=\"hidden\" name=\"page\" value=\"{}\">", page);
    let _ = write!(
        body,
        "<input type=\"hidden\" name=\"currentSearch\" value=\"{}\">",
        escape(query.search.as_deref().unwrap_or(""))
    );
    let _ = write!(body, "<input type=\"hidden\" name=\"currentStatus\" value=\"{}\">", query.status.as_str());
    let aria = if current { " aria-current=\"page\" disabled" } else { "" };
    let _ = writeln!(body, "<button type=\"submit\"{}>{}</button></form>", aria, escape(label));
}

fn render_pagination(body: &mut String, slice: &PageSlice<'_>, query: &ListQuery) {
    if !slice.show_controls() {
        return;
    }
    body.push_str("<nav class=\"pagination\">\n");
    let _ = writeln!(
        body,
        "<p>Showing {} to {} of {} results</p>",
        slice.start_item, slice.end_item, slice.total
    );
    if slice.has_previous() {
        page_button(body, query, slice.current - 1, "Previous", false);
    }
    for item in page_numbers(slice.current, slice.total_pages) {
        match item {
            PageItem::Page(n) => page_button(body, query, n, &n.to_string(), n == slice.current),
            PageItem::Ellipsis => body.push_str("<span>...</span>\n"),
        }
    }
    if slice.has_next() {
        page_button(body, query, slice.current + 1, "Next", false);
    }
    body.push_str("</nav>\n");
}
