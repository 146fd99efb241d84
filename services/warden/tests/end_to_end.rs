mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{memory_store, read_json};
use http_helpers::{get_request, json_request};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use warden::app::{AppState, StateOptions, build_router};
use warden::audit::QueuedChangeSink;
use warden::principal::StaticPrincipalDirectory;

type App = axum::routing::RouterIntoService<Body, ()>;

async fn call(app: &App, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    if status == StatusCode::NO_CONTENT {
        return (status, Value::Null);
    }
    (status, read_json(response).await)
}

async fn check(app: &App, principal_id: &str, permission_key: &str) -> bool {
    let (status, body) = call(
        app,
        json_request(
            "POST",
            "/v1/check",
            json!({"principal_id": principal_id, "permission_key": permission_key}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["allowed"].as_bool().expect("allowed")
}

async fn create(app: &App, uri: &str, body: Value) -> Value {
    let (status, body) = call(app, json_request("POST", uri, body)).await;
    assert_eq!(status, StatusCode::CREATED, "{uri}: {body}");
    body
}

fn paths(items: &Value) -> Vec<String> {
    let mut out = Vec::new();
    fn walk(items: &Value, out: &mut Vec<String>) {
        for item in items.as_array().into_iter().flatten() {
            out.push(item["path"].as_str().unwrap_or_default().to_string());
            walk(&item["children"], out);
        }
    }
    walk(items, &mut out);
    out
}

#[tokio::test]
async fn grants_flow_through_check_and_role_deletion_revokes() {
    let store = memory_store();
    let sink = Arc::new(QueuedChangeSink::spawn(store.clone(), 64));
    let state = AppState::assemble(
        store,
        Arc::new(StaticPrincipalDirectory::allow_all()),
        sink.clone(),
        StateOptions::default(),
    );
    let app = build_router(state).into_service();

    create(&app, "/v1/permissions", json!({"key": "report:view", "name": "View reports"})).await;
    create(&app, "/v1/roles", json!({"key": "analyst", "name": "Analyst"})).await;
    assert!(!check(&app, "u1", "report:view").await);

    let (status, body) = call(
        &app,
        json_request(
            "POST",
            "/v1/roles/analyst/permissions",
            json!({"permission_keys": ["report:view"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["added"], json!(["report:view"]));

    let (status, _) = call(
        &app,
        json_request("POST", "/v1/users/u1/roles", json!({"role_keys": ["analyst"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(check(&app, "u1", "report:view").await);
    assert!(!check(&app, "u2", "report:view").await);

    let (status, body) = call(&app, get_request("/v1/users/u1/permissions")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["key"], "report:view");

    // Repeating the assignment adds nothing.
    let (_, body) = call(
        &app,
        json_request("POST", "/v1/users/u1/roles", json!({"role_keys": ["analyst"]})),
    )
    .await;
    assert_eq!(body["added"], json!([]));

    let (status, _) = call(&app, json_request("DELETE", "/v1/roles/analyst", json!({}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!check(&app, "u1", "report:view").await);

    let (_, body) = call(&app, get_request("/v1/users/u1/roles")).await;
    assert_eq!(body["items"], json!([]));

    sink.close().await;
    let (status, body) = call(&app, get_request("/v1/changes?target_type=role")).await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = body["items"]
        .as_array()
        .expect("items")
        .iter()
        .filter_map(|item| item["action"].as_str())
        .collect();
    assert_eq!(actions, vec!["CREATE_ROLE", "DELETE_ROLE"]);
    assert_eq!(body["items"][0]["actor_id"], "admin");

    let (status, _) = call(&app, get_request("/v1/changes?action=EXPLODE")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn permission_deletion_revokes_through_every_role() {
    let app = build_router(common::default_state()).into_service();
    create(&app, "/v1/permissions", json!({"key": "user:manage", "name": "Manage"})).await;
    for role in ["admin", "ops"] {
        create(&app, "/v1/roles", json!({"key": role, "name": role})).await;
        call(
            &app,
            json_request(
                "POST",
                &format!("/v1/roles/{role}/permissions"),
                json!({"permission_keys": ["user:manage"]}),
            ),
        )
        .await;
    }
    call(
        &app,
        json_request("POST", "/v1/users/u1/roles", json!({"role_keys": ["admin", "ops"]})),
    )
    .await;
    assert!(check(&app, "u1", "user:manage").await);

    let (status, _) = call(
        &app,
        json_request(
            "DELETE",
            "/v1/roles/admin/permissions",
            json!({"permission_keys": ["user:manage"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(check(&app, "u1", "user:manage").await);

    let (status, _) = call(
        &app,
        json_request("DELETE", "/v1/permissions/user:manage", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!check(&app, "u1", "user:manage").await);
}

#[tokio::test]
async fn visible_menu_follows_grants() {
    let app = build_router(common::default_state()).into_service();
    create(&app, "/v1/permissions", json!({"key": "report:view", "name": "View", "type": "menu"})).await;
    create(&app, "/v1/roles", json!({"key": "analyst", "name": "Analyst"})).await;
    call(
        &app,
        json_request(
            "POST",
            "/v1/roles/analyst/permissions",
            json!({"permission_keys": ["report:view"]}),
        ),
    )
    .await;

    let reports = create(
        &app,
        "/v1/menus",
        json!({"name": "Reports", "path": "/reports", "permission_key": "report:view"}),
    )
    .await;
    let reports_id = reports["id"].as_str().expect("id").to_string();
    create(
        &app,
        "/v1/menus",
        json!({"name": "Daily", "path": "/reports/daily", "parent_id": reports_id, "order": 1}),
    )
    .await;
    create(
        &app,
        "/v1/menus",
        json!({"name": "Archive", "path": "/reports/archive", "parent_id": reports_id, "order": 0}),
    )
    .await;
    let settings = create(
        &app,
        "/v1/menus",
        json!({"name": "Settings", "path": "/settings", "order": 9}),
    )
    .await;
    create(
        &app,
        "/v1/menus",
        json!({"name": "Help", "path": "/help", "order": 10}),
    )
    .await;
    let settings_id = settings["id"].as_str().expect("id").to_string();
    create(
        &app,
        "/v1/menus",
        json!({"name": "Secrets", "path": "/settings/secrets", "parent_id": settings_id}),
    )
    .await;

    // u2 holds nothing: only the open leaves of open branches.
    let (status, body) = call(&app, get_request("/v1/users/u2/menu")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paths(&body["items"]), vec!["/settings", "/settings/secrets", "/help"]);

    call(
        &app,
        json_request("POST", "/v1/users/u1/roles", json!({"role_keys": ["analyst"]})),
    )
    .await;
    let (_, body) = call(&app, get_request("/v1/users/u1/menu")).await;
    assert_eq!(
        paths(&body["items"]),
        vec![
            "/reports",
            "/reports/archive",
            "/reports/daily",
            "/settings",
            "/settings/secrets",
            "/help",
        ]
    );

    // Disabling a branch hides it from the cached result too.
    let (status, _) = call(
        &app,
        json_request("PUT", &format!("/v1/menus/{reports_id}"), json!({"enabled": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call(&app, get_request("/v1/users/u1/menu")).await;
    assert_eq!(paths(&body["items"]), vec!["/settings", "/settings/secrets", "/help"]);

    let (status, _) = call(
        &app,
        json_request(
            "PUT",
            &format!("/v1/menus/{settings_id}/guard"),
            json!({"permission_key": "nope:missing"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
