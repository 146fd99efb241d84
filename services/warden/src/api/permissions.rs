//! Permission catalog endpoints.
use crate::api::error::ApiError;
use crate::api::types::PermissionListResponse;
use crate::api::{RequestActor, page_from_query};
use crate::app::AppState;
use crate::model::{NewPermission, Permission, PermissionPatch};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::collections::HashMap;

#[utoipa::path(
    get,
    path = "/v1/permissions",
    tag = "permissions",
    params(
        ("page" = Option<u32>, Query, description = "One-based page number"),
        ("page_size" = Option<u32>, Query, description = "Page size, at most 100"),
        ("type" = Option<String>, Query, description = "Only permissions of this type")
    ),
    responses(
        (status = 200, description = "Page of permissions", body = PermissionListResponse)
    )
)]
pub(crate) async fn list_permissions(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Result<Json<PermissionListResponse>, ApiError> {
    let page = state
        .catalog
        .list_permissions(page_from_query(&params), params.get("type").map(String::as_str))
        .await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    post,
    path = "/v1/permissions",
    tag = "permissions",
    request_body = NewPermission,
    responses(
        (status = 201, description = "Permission created", body = Permission),
        (status = 409, description = "Permission already exists", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_permission(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(body): Json<NewPermission>,
) -> Result<impl IntoResponse, ApiError> {
    let permission = state.catalog.create_permission(&actor, body).await?;
    Ok((StatusCode::CREATED, Json(permission)))
}

#[utoipa::path(
    get,
    path = "/v1/permissions/{permission_key}",
    tag = "permissions",
    params(("permission_key" = String, Path, description = "Permission key")),
    responses(
        (status = 200, description = "Permission", body = Permission),
        (status = 404, description = "Permission not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_permission(
    Path(permission_key): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Permission>, ApiError> {
    Ok(Json(state.catalog.get_permission(&permission_key).await?))
}

#[utoipa::path(
    put,
    path = "/v1/permissions/{permission_key}",
    tag = "permissions",
    params(("permission_key" = String, Path, description = "Permission key")),
    request_body = PermissionPatch,
    responses(
        (status = 200, description = "Permission updated", body = Permission)
    )
)]
pub(crate) async fn update_permission(
    Path(permission_key): Path<String>,
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(body): Json<PermissionPatch>,
) -> Result<Json<Permission>, ApiError> {
    let permission = state
        .catalog
        .update_permission(&actor, &permission_key, body)
        .await?;
    Ok(Json(permission))
}

#[utoipa::path(
    delete,
    path = "/v1/permissions/{permission_key}",
    tag = "permissions",
    params(("permission_key" = String, Path, description = "Permission key")),
    responses(
        (status = 204, description = "Permission and its grants deleted"),
        (status = 404, description = "Permission not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_permission(
    Path(permission_key): Path<String>,
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_permission(&actor, &permission_key).await?;
    Ok(StatusCode::NO_CONTENT)
}
