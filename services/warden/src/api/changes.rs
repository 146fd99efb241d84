//! Change history read endpoint.
use crate::api::error::{ApiError, api_validation_error};
use crate::api::types::ChangeListResponse;
use crate::app::AppState;
use crate::authz::AuthzError;
use crate::model::ChangeQuery;
use axum::Json;
use axum::extract::{Query, State};
use std::collections::HashMap;
use std::str::FromStr;

#[utoipa::path(
    get,
    path = "/v1/changes",
    tag = "changes",
    params(
        ("since" = Option<u64>, Query, description = "First sequence number to return"),
        ("limit" = Option<usize>, Query, description = "Maximum records returned"),
        ("target_type" = Option<String>, Query, description = "ROLE, PERMISSION, ROLE_PERMISSION, USER_ROLE or MENU"),
        ("target_key" = Option<String>, Query, description = "Exact target key"),
        ("action" = Option<String>, Query, description = "Change action, e.g. ASSIGN_USER_ROLE")
    ),
    responses(
        (status = 200, description = "Change records in sequence order", body = ChangeListResponse)
    )
)]
pub(crate) async fn list_changes(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Result<Json<ChangeListResponse>, ApiError> {
    let query = ChangeQuery {
        since: params
            .get("since")
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(0),
        limit: params
            .get("limit")
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(0),
        target_type: parse_filter(&params, "target_type")?,
        target_key: params.get("target_key").filter(|key| !key.is_empty()).cloned(),
        action: parse_filter(&params, "action")?,
    };
    let changes = state
        .store
        .list_changes(&query)
        .await
        .map_err(AuthzError::from)?;
    Ok(Json(ChangeListResponse {
        items: changes.items,
        next_seq: changes.next_seq,
    }))
}

fn parse_filter<T>(params: &HashMap<String, String>, name: &str) -> Result<Option<T>, ApiError>
where
    T: FromStr<Err = String>,
{
    match params.get(name).filter(|value| !value.is_empty()) {
        Some(value) => value
            .to_ascii_uppercase()
            .parse()
            .map(Some)
            .map_err(|err: String| api_validation_error(&err)),
        None => Ok(None),
    }
}
