//! Health endpoint.
use crate::api::error::ApiError;
use crate::api::types::HealthStatus;
use crate::app::AppState;
use crate::authz::AuthzError;
use axum::Json;
use axum::extract::State;

#[utoipa::path(
    get,
    path = "/v1/system/health",
    tag = "system",
    responses(
        (status = 200, description = "Service health", body = HealthStatus),
        (status = 503, description = "Grant store unreachable", body = crate::api::types::ErrorResponse)
    )
)]
/// Probes the grant store and reports the active backend.
///
/// # Errors
/// - Returns 503 if the store health check fails.
pub(crate) async fn system_health(
    State(state): State<AppState>,
) -> Result<Json<HealthStatus>, ApiError> {
    state
        .store
        .health_check()
        .await
        .map_err(AuthzError::from)?;
    Ok(Json(HealthStatus {
        status: "ok".to_string(),
        api_version: state.api_version.clone(),
        backend: state.store.backend_name().to_string(),
        durable: state.store.is_durable(),
    }))
}
