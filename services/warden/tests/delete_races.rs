mod common;

use common::{InterleavingStore, memory_store};
use std::sync::Arc;
use std::time::Duration;
use warden::audit::TracingChangeSink;
use warden::authz::{AuthorizationResolver, CatalogService};
use warden::model::{Actor, NewPermission, NewRole};
use warden::store::GrantStore;

fn catalog() -> (CatalogService, Arc<InterleavingStore>, AuthorizationResolver) {
    let inner = memory_store();
    let resolver = AuthorizationResolver::new(inner.clone(), Duration::from_secs(60));
    let store = Arc::new(InterleavingStore::new(inner, "late", "editor"));
    let service = CatalogService::new(
        store.clone(),
        resolver.clone(),
        Arc::new(TracingChangeSink),
    );
    (service, store, resolver)
}

async fn seed(service: &CatalogService, store: &InterleavingStore) {
    let actor = Actor::user("admin");
    service
        .create_permission(
            &actor,
            NewPermission {
                key: "report:view".to_string(),
                name: "View reports".to_string(),
                kind: "api".to_string(),
                description: String::new(),
            },
        )
        .await
        .expect("permission");
    for key in ["analyst", "editor"] {
        service
            .create_role(
                &actor,
                NewRole {
                    key: key.to_string(),
                    name: key.to_string(),
                    description: String::new(),
                },
            )
            .await
            .expect("role");
    }
    store
        .add_role_permissions("analyst", &["report:view".to_string()])
        .await
        .expect("grant");
}

#[tokio::test]
async fn role_delete_revokes_principals_assigned_after_holder_enumeration() {
    let (service, store, resolver) = catalog();
    seed(&service, &store).await;
    store.interleave_with(resolver.clone());

    service
        .delete_role(&Actor::user("admin"), "analyst")
        .await
        .expect("delete");

    assert!(
        !resolver
            .check_permission("late", "report:view")
            .await
            .expect("check")
    );
    assert!(store.principal_role_keys("late").await.expect("roles").is_empty());
}

#[tokio::test]
async fn permission_delete_revokes_holders_of_roles_granted_after_enumeration() {
    let (service, store, resolver) = catalog();
    seed(&service, &store).await;
    store.interleave_with(resolver.clone());

    service
        .delete_permission(&Actor::user("admin"), "report:view")
        .await
        .expect("delete");

    assert!(
        !resolver
            .check_permission("late", "report:view")
            .await
            .expect("check")
    );
    assert!(
        store
            .roles_granting_permission("report:view")
            .await
            .expect("roles")
            .is_empty()
    );
}
