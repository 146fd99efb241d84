//! Permission check and effective-permission listing.
use crate::api::error::ApiError;
use crate::api::types::{CheckRequest, CheckResponse, PermissionsResponse};
use crate::app::AppState;
use crate::authz::keys::{validate_permission_key, validate_principal_id};
use axum::Json;
use axum::extract::{Path, Query, State};
use std::collections::HashMap;

#[utoipa::path(
    post,
    path = "/v1/check",
    tag = "authorization",
    request_body = CheckRequest,
    responses(
        (status = 200, description = "Permission decision", body = CheckResponse),
        (status = 503, description = "Grant store unavailable; treat as denied", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn check_permission(
    State(state): State<AppState>,
    Json(body): Json<CheckRequest>,
) -> Result<Json<CheckResponse>, ApiError> {
    validate_principal_id(&body.principal_id)?;
    validate_permission_key(&body.permission_key)?;
    let allowed = state
        .resolver
        .check_permission(&body.principal_id, &body.permission_key)
        .await?;
    Ok(Json(CheckResponse {
        principal_id: body.principal_id,
        permission_key: body.permission_key,
        allowed,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/users/{principal_id}/permissions",
    tag = "authorization",
    params(
        ("principal_id" = String, Path, description = "Principal identifier"),
        ("type" = Option<String>, Query, description = "Only permissions of this type")
    ),
    responses(
        (status = 200, description = "Effective permissions", body = PermissionsResponse)
    )
)]
pub(crate) async fn user_permissions(
    Path(principal_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Result<Json<PermissionsResponse>, ApiError> {
    validate_principal_id(&principal_id)?;
    let kind = params
        .get("type")
        .map(String::as_str)
        .filter(|kind| !kind.is_empty());
    let items = state.resolver.list_permissions(&principal_id, kind).await?;
    Ok(Json(PermissionsResponse { items }))
}
