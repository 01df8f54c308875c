//! Presence query endpoints backed by the connection registry.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::middleware::AuthUser;
use crate::error::{ApiError, ApiErrorBody};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/presence/{tenant_id}", get(tenant_presence))
        .route("/presence/{tenant_id}/{user_id}", get(user_connections))
}

#[derive(Debug, Deserialize)]
pub struct TenantPresenceParams {
    pub exclude_user: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TenantPresenceResponse {
    pub tenant_id: String,
    /// Connection ids only; one entry per live connection.
    pub connections: Vec<String>,
    /// Distinct user ids with at least one live connection.
    pub users: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/presence/{tenant_id}",
    tag = "Presence",
    security(("bearer" = [])),
    params(
        ("tenant_id" = String, Path, description = "Tenant ID"),
        ("exclude_user" = Option<String>, Query, description = "User ID to leave out of the results"),
    ),
    responses(
        (status = 200, description = "Live connections under the tenant", body = TenantPresenceResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
    ),
)]
pub async fn tenant_presence(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Query(params): Query<TenantPresenceParams>,
) -> Result<Json<TenantPresenceResponse>, ApiError> {
    let exclude = params.exclude_user.as_deref();
    let connections = state
        .presence
        .find_tenant_connections(&tenant_id, exclude)
        .await?;
    let users = state.presence.tenant_users(&tenant_id, exclude).await?;

    Ok(Json(TenantPresenceResponse {
        tenant_id,
        connections,
        users,
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserConnectionsResponse {
    pub tenant_id: String,
    pub user_id: String,
    /// Full registry keys, `notification_clients:<tenant>:<user>:<connection>`.
    pub keys: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/presence/{tenant_id}/{user_id}",
    tag = "Presence",
    security(("bearer" = [])),
    params(
        ("tenant_id" = String, Path, description = "Tenant ID"),
        ("user_id" = String, Path, description = "External user ID"),
    ),
    responses(
        (status = 200, description = "Registry keys for the user's live connections", body = UserConnectionsResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
    ),
)]
pub async fn user_connections(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((tenant_id, user_id)): Path<(String, String)>,
) -> Result<Json<UserConnectionsResponse>, ApiError> {
    let keys = state.presence.get_connections(&tenant_id, &user_id).await?;
    Ok(Json(UserConnectionsResponse {
        tenant_id,
        user_id,
        keys,
    }))
}
