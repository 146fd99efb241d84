//! Menu tree administration endpoints.
use crate::api::RequestActor;
use crate::api::error::ApiError;
use crate::api::types::{MenuGuardRequest, MenuTreeResponse};
use crate::app::AppState;
use crate::model::{MenuNode, MenuNodePatch, NewMenuNode};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

#[utoipa::path(
    get,
    path = "/v1/menus",
    tag = "menus",
    responses(
        (status = 200, description = "Full menu tree, unfiltered", body = MenuTreeResponse)
    )
)]
pub(crate) async fn menu_tree(
    State(state): State<AppState>,
) -> Result<Json<MenuTreeResponse>, ApiError> {
    let items = state.menus.get_menu_tree().await?;
    Ok(Json(MenuTreeResponse { items }))
}

#[utoipa::path(
    post,
    path = "/v1/menus",
    tag = "menus",
    request_body = NewMenuNode,
    responses(
        (status = 201, description = "Menu node created", body = MenuNode),
        (status = 409, description = "Duplicate path or depth exceeded", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_menu_node(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(body): Json<NewMenuNode>,
) -> Result<impl IntoResponse, ApiError> {
    let node = state.menus.create_menu_node(&actor, body).await?;
    Ok((StatusCode::CREATED, Json(node)))
}

#[utoipa::path(
    get,
    path = "/v1/menus/{id}",
    tag = "menus",
    params(("id" = String, Path, description = "Menu node id")),
    responses(
        (status = 200, description = "Menu node", body = MenuNode),
        (status = 404, description = "Menu node not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_menu_node(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<MenuNode>, ApiError> {
    Ok(Json(state.menus.get_menu_node(&id).await?))
}

#[utoipa::path(
    put,
    path = "/v1/menus/{id}",
    tag = "menus",
    params(("id" = String, Path, description = "Menu node id")),
    request_body = MenuNodePatch,
    responses(
        (status = 200, description = "Menu node updated", body = MenuNode),
        (status = 409, description = "Cycle, duplicate path, or depth exceeded", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_menu_node(
    Path(id): Path<String>,
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(body): Json<MenuNodePatch>,
) -> Result<Json<MenuNode>, ApiError> {
    Ok(Json(state.menus.update_menu_node(&actor, &id, body).await?))
}

#[utoipa::path(
    put,
    path = "/v1/menus/{id}/guard",
    tag = "menus",
    params(("id" = String, Path, description = "Menu node id")),
    request_body = MenuGuardRequest,
    responses(
        (status = 200, description = "Guard replaced", body = MenuNode),
        (status = 404, description = "Menu node or permission not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_menu_guard(
    Path(id): Path<String>,
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(body): Json<MenuGuardRequest>,
) -> Result<Json<MenuNode>, ApiError> {
    let node = state
        .menus
        .update_menu_node_guard(&actor, &id, body.permission_key)
        .await?;
    Ok(Json(node))
}

#[utoipa::path(
    delete,
    path = "/v1/menus/{id}",
    tag = "menus",
    params(("id" = String, Path, description = "Menu node id")),
    responses(
        (status = 204, description = "Menu node deleted"),
        (status = 409, description = "Node still has children", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_menu_node(
    Path(id): Path<String>,
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
) -> Result<StatusCode, ApiError> {
    state.menus.delete_menu_node(&actor, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
