//! JSON passthrough to the identity service admin API.
//!
//! Mounted under the gate's bypass prefix: there is no session check here.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::kratos::{CreateIdentityRequest, Identity, IdentityList, ListParams, Traits, UpdateIdentityRequest};
use crate::listing::StatusFilter;

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    pub status: Option<String>,
}

impl ListUsersQuery {
    fn to_params(&self) -> ListParams {
        ListParams {
            page: self.page,
            per_page: self.per_page,
            page_size: self.page_size,
            search: self.search.clone().filter(|s| !s.trim().is_empty()),
            status: StatusFilter::parse_lenient(self.status.as_deref()),
        }
    }
}

/// `name` is a single display string; it becomes the first name.
#[derive(Debug, Default, Deserialize)]
pub struct UserBody {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl UserBody {
    fn email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn traits(&self, email: &str) -> Traits {
        Traits::from_form(email, self.name.as_deref(), None)
    }
}

/// Identity ids are UUIDs; anything else never reaches the identity service.
fn parse_id(id: &str) -> AppResult<String> {
    uuid::Uuid::parse_str(id)
        .map(|u| u.to_string())
        .map_err(|_| AppError::user("invalid_id", "User ID must be a UUID"))
}

pub async fn list_users(State(state): State<AppState>, Query(q): Query<ListUsersQuery>) -> AppResult<Json<IdentityList>> {
    state.kratos.list_identities(&q.to_params()).await.map(Json).map_err(|e| {
        error!(target: "api", "Error fetching users: {}", e);
        AppError::internal("list_failed", "Failed to fetch users")
    })
}

pub async fn create_user(State(state): State<AppState>, Json(body): Json<UserBody>) -> AppResult<impl IntoResponse> {
    let (Some(email), Some(password)) = (body.email(), body.password.as_deref().filter(|p| !p.is_empty())) else {
        return Err(AppError::user("missing_fields", "Email and password are required"));
    };
    let req = CreateIdentityRequest::with_password(body.traits(email), password);
    let identity = state.kratos.create_identity(&req).await.map_err(|e| {
        error!(target: "api", "Error creating user: {}", e);
        AppError::from_kratos(&e, "Failed to create user")
    })?;
    Ok((StatusCode::CREATED, Json(identity_body(identity))))
}

pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Value>> {
    let id = parse_id(&id)?;
    let identity = state.kratos.get_identity(&id).await.map_err(|e| {
        error!(target: "api", "Error fetching user: {}", e);
        AppError::from_kratos(&e, "Failed to fetch user")
    })?;
    Ok(Json(identity_body(identity)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UserBody>,
) -> AppResult<Json<Value>> {
    let id = parse_id(&id)?;
    let Some(email) = body.email() else {
        return Err(AppError::user("missing_fields", "Email is required"));
    };
    let req = UpdateIdentityRequest::traits_only(body.traits(email));
    let identity = state.kratos.update_identity(&id, &req).await.map_err(|e| {
        error!(target: "api", "Error updating user: {}", e);
        AppError::from_kratos(&e, "Failed to update user")
    })?;
    Ok(Json(identity_body(identity)))
}

pub async fn delete_user(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Value>> {
    let id = parse_id(&id)?;
    state.kratos.delete_identity(&id).await.map_err(|e| {
        error!(target: "api", "Error deleting user: {}", e);
        AppError::from_kratos(&e, "Failed to delete user")
    })?;
    Ok(Json(json!({ "success": true })))
}

fn identity_body(identity: Identity) -> Value {
    json!({ "identity": identity })
}
