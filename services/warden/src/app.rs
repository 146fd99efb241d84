//! HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! state injected into handlers.
//!
//! # Notes
//! Health and the OpenAPI document stay reachable without the internal API
//! key so probes and tooling work before credentials are distributed.
use crate::api;
use crate::audit::ChangeSink;
use crate::authz::{AuthorizationResolver, CatalogService, GrantService};
use crate::config::DEFAULT_CACHE_TTL;
use crate::menu::{DEFAULT_MAX_DEPTH, MenuEngine, MenuService};
use crate::observability;
use crate::principal::PrincipalDirectory;
use crate::store::WardenStore;
use axum::Router;
use axum::routing::{get, post, put};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;

#[derive(Clone)]
pub struct AppState {
    pub api_version: String,
    pub store: Arc<dyn WardenStore>,
    pub resolver: AuthorizationResolver,
    pub catalog: CatalogService,
    pub grants: GrantService,
    pub menus: MenuService,
    pub engine: MenuEngine,
    pub internal_api_key: Option<String>,
}

/// Tunables applied when wiring services onto a store.
#[derive(Debug, Clone)]
pub struct StateOptions {
    pub cache_ttl: Duration,
    pub menu_max_depth: usize,
    pub internal_api_key: Option<String>,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            menu_max_depth: DEFAULT_MAX_DEPTH,
            internal_api_key: None,
        }
    }
}

impl AppState {
    /// Wires every service onto one shared store and resolver.
    pub fn assemble<S>(
        store: Arc<S>,
        directory: Arc<dyn PrincipalDirectory>,
        sink: Arc<dyn ChangeSink>,
        options: StateOptions,
    ) -> Self
    where
        S: WardenStore + 'static,
    {
        let resolver = AuthorizationResolver::new(store.clone(), options.cache_ttl);
        let catalog = CatalogService::new(store.clone(), resolver.clone(), sink.clone());
        let grants = GrantService::new(store.clone(), resolver.clone(), directory, sink.clone());
        let menus = MenuService::new(
            store.clone(),
            store.clone(),
            resolver.clone(),
            sink,
            options.menu_max_depth,
        );
        let engine = MenuEngine::new(resolver.clone(), menus.clone());
        Self {
            api_version: "v1".to_string(),
            store,
            resolver,
            catalog,
            grants,
            menus,
            engine,
            internal_api_key: options.internal_api_key,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    let protected = Router::new()
        .route("/v1/check", post(api::check::check_permission))
        .route(
            "/v1/users/roles/batch",
            post(api::users::batch_user_roles),
        )
        .route(
            "/v1/users/:principal_id/permissions",
            get(api::check::user_permissions),
        )
        .route(
            "/v1/users/:principal_id/roles",
            get(api::users::user_roles)
                .post(api::users::assign_user_roles)
                .delete(api::users::unassign_user_roles),
        )
        .route("/v1/users/:principal_id/menu", get(api::users::user_menu))
        .route(
            "/v1/roles",
            get(api::roles::list_roles).post(api::roles::create_role),
        )
        .route(
            "/v1/roles/:role_key",
            get(api::roles::get_role)
                .put(api::roles::update_role)
                .delete(api::roles::delete_role),
        )
        .route(
            "/v1/roles/:role_key/permissions",
            get(api::roles::role_permissions)
                .post(api::roles::assign_role_permissions)
                .delete(api::roles::unassign_role_permissions),
        )
        .route(
            "/v1/permissions",
            get(api::permissions::list_permissions).post(api::permissions::create_permission),
        )
        .route(
            "/v1/permissions/:permission_key",
            get(api::permissions::get_permission)
                .put(api::permissions::update_permission)
                .delete(api::permissions::delete_permission),
        )
        .route(
            "/v1/menus",
            get(api::menus::menu_tree).post(api::menus::create_menu_node),
        )
        .route(
            "/v1/menus/:id",
            get(api::menus::get_menu_node)
                .put(api::menus::update_menu_node)
                .delete(api::menus::delete_menu_node),
        )
        .route("/v1/menus/:id/guard", put(api::menus::update_menu_guard))
        .route("/v1/changes", get(api::changes::list_changes))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            api::require_internal_key,
        ));

    Router::new()
        .route("/v1/system/health", get(api::system::system_health))
        .route("/v1/openapi.json", get(api::openapi::openapi_json))
        .merge(protected)
        .layer(trace_layer)
        .with_state(state)
}
