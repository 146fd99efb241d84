//! Principal role assignments and the principal's visible menu.
use crate::api::RequestActor;
use crate::api::error::ApiError;
use crate::api::types::{
    AssignedResponse, BatchUserRolesRequest, BatchUserRolesResponse, MenuTreeResponse,
    RoleKeysRequest, RolesResponse, UnassignedResponse,
};
use crate::app::AppState;
use axum::Json;
use axum::extract::{Path, State};

#[utoipa::path(
    get,
    path = "/v1/users/{principal_id}/roles",
    tag = "users",
    params(("principal_id" = String, Path, description = "Principal identifier")),
    responses(
        (status = 200, description = "Roles assigned to the principal", body = RolesResponse)
    )
)]
pub(crate) async fn user_roles(
    Path(principal_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RolesResponse>, ApiError> {
    let items = state.grants.user_roles(&principal_id).await?;
    Ok(Json(RolesResponse { items }))
}

#[utoipa::path(
    post,
    path = "/v1/users/{principal_id}/roles",
    tag = "users",
    params(("principal_id" = String, Path, description = "Principal identifier")),
    request_body = RoleKeysRequest,
    responses(
        (status = 200, description = "Newly assigned roles", body = AssignedResponse),
        (status = 404, description = "Principal or role not found", body = crate::api::types::ErrorResponse),
        (status = 503, description = "Principal directory unavailable", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn assign_user_roles(
    Path(principal_id): Path<String>,
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(body): Json<RoleKeysRequest>,
) -> Result<Json<AssignedResponse>, ApiError> {
    let added = state
        .grants
        .assign_roles_to_user(&actor, &principal_id, &body.role_keys)
        .await?;
    Ok(Json(AssignedResponse { added }))
}

#[utoipa::path(
    delete,
    path = "/v1/users/{principal_id}/roles",
    tag = "users",
    params(("principal_id" = String, Path, description = "Principal identifier")),
    request_body = RoleKeysRequest,
    responses(
        (status = 200, description = "Number of assignments removed", body = UnassignedResponse)
    )
)]
pub(crate) async fn unassign_user_roles(
    Path(principal_id): Path<String>,
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(body): Json<RoleKeysRequest>,
) -> Result<Json<UnassignedResponse>, ApiError> {
    let removed = state
        .grants
        .unassign_roles_from_user(&actor, &principal_id, &body.role_keys)
        .await?;
    Ok(Json(UnassignedResponse { removed }))
}

#[utoipa::path(
    post,
    path = "/v1/users/roles/batch",
    tag = "users",
    request_body = BatchUserRolesRequest,
    responses(
        (status = 200, description = "Roles keyed by principal", body = BatchUserRolesResponse)
    )
)]
pub(crate) async fn batch_user_roles(
    State(state): State<AppState>,
    Json(body): Json<BatchUserRolesRequest>,
) -> Result<Json<BatchUserRolesResponse>, ApiError> {
    let items = state.grants.batch_user_roles(&body.principal_ids).await?;
    Ok(Json(BatchUserRolesResponse { items }))
}

#[utoipa::path(
    get,
    path = "/v1/users/{principal_id}/menu",
    tag = "users",
    params(("principal_id" = String, Path, description = "Principal identifier")),
    responses(
        (status = 200, description = "Menu nodes visible to the principal", body = MenuTreeResponse)
    )
)]
pub(crate) async fn user_menu(
    Path(principal_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<MenuTreeResponse>, ApiError> {
    let forest = state.engine.resolve_visible_menu(&principal_id).await?;
    Ok(Json(MenuTreeResponse {
        items: forest.as_ref().clone(),
    }))
}
