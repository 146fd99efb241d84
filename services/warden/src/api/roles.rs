//! Role administration and role grant endpoints.
use crate::api::error::ApiError;
use crate::api::page_from_query;
use crate::api::types::{
    AssignedResponse, PermissionKeysRequest, PermissionsResponse, RoleListResponse,
    UnassignedResponse,
};
use crate::api::RequestActor;
use crate::app::AppState;
use crate::model::{NewRole, Role, RolePatch};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::collections::HashMap;

#[utoipa::path(
    get,
    path = "/v1/roles",
    tag = "roles",
    params(
        ("page" = Option<u32>, Query, description = "One-based page number"),
        ("page_size" = Option<u32>, Query, description = "Page size, at most 100")
    ),
    responses(
        (status = 200, description = "Page of roles", body = RoleListResponse)
    )
)]
pub(crate) async fn list_roles(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Result<Json<RoleListResponse>, ApiError> {
    let page = state.catalog.list_roles(page_from_query(&params)).await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    post,
    path = "/v1/roles",
    tag = "roles",
    request_body = NewRole,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 409, description = "Role already exists", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_role(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(body): Json<NewRole>,
) -> Result<impl IntoResponse, ApiError> {
    let role = state.catalog.create_role(&actor, body).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

#[utoipa::path(
    get,
    path = "/v1/roles/{role_key}",
    tag = "roles",
    params(("role_key" = String, Path, description = "Role key")),
    responses(
        (status = 200, description = "Role", body = Role),
        (status = 404, description = "Role not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_role(
    Path(role_key): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Role>, ApiError> {
    Ok(Json(state.catalog.get_role(&role_key).await?))
}

#[utoipa::path(
    put,
    path = "/v1/roles/{role_key}",
    tag = "roles",
    params(("role_key" = String, Path, description = "Role key")),
    request_body = RolePatch,
    responses(
        (status = 200, description = "Role updated", body = Role),
        (status = 404, description = "Role not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_role(
    Path(role_key): Path<String>,
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(body): Json<RolePatch>,
) -> Result<Json<Role>, ApiError> {
    Ok(Json(state.catalog.update_role(&actor, &role_key, body).await?))
}

#[utoipa::path(
    delete,
    path = "/v1/roles/{role_key}",
    tag = "roles",
    params(("role_key" = String, Path, description = "Role key")),
    responses(
        (status = 204, description = "Role, its grants, and its assignments deleted"),
        (status = 404, description = "Role not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_role(
    Path(role_key): Path<String>,
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_role(&actor, &role_key).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/v1/roles/{role_key}/permissions",
    tag = "roles",
    params(("role_key" = String, Path, description = "Role key")),
    responses(
        (status = 200, description = "Permissions granted to the role", body = PermissionsResponse)
    )
)]
pub(crate) async fn role_permissions(
    Path(role_key): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PermissionsResponse>, ApiError> {
    let items = state.grants.role_permissions(&role_key).await?;
    Ok(Json(PermissionsResponse { items }))
}

#[utoipa::path(
    post,
    path = "/v1/roles/{role_key}/permissions",
    tag = "roles",
    params(("role_key" = String, Path, description = "Role key")),
    request_body = PermissionKeysRequest,
    responses(
        (status = 200, description = "Newly granted permissions", body = AssignedResponse),
        (status = 404, description = "Role or permission not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn assign_role_permissions(
    Path(role_key): Path<String>,
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(body): Json<PermissionKeysRequest>,
) -> Result<Json<AssignedResponse>, ApiError> {
    let added = state
        .grants
        .assign_permissions_to_role(&actor, &role_key, &body.permission_keys)
        .await?;
    Ok(Json(AssignedResponse { added }))
}

#[utoipa::path(
    delete,
    path = "/v1/roles/{role_key}/permissions",
    tag = "roles",
    params(("role_key" = String, Path, description = "Role key")),
    request_body = PermissionKeysRequest,
    responses(
        (status = 200, description = "Number of grants removed", body = UnassignedResponse)
    )
)]
pub(crate) async fn unassign_role_permissions(
    Path(role_key): Path<String>,
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(body): Json<PermissionKeysRequest>,
) -> Result<Json<UnassignedResponse>, ApiError> {
    let removed = state
        .grants
        .unassign_permissions_from_role(&actor, &role_key, &body.permission_keys)
        .await?;
    Ok(Json(UnassignedResponse { removed }))
}
