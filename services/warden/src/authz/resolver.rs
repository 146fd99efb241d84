//! Effective-permission resolution with a coherent local cache.
//!
//! # Purpose
//! Computes the union of permissions granted through a principal's roles,
//! memoizes it, and drops memoized results whenever a grant mutation could
//! change them.
//!
//! # Key invariants
//! - A failed resolution returns an error and caches nothing.
//! - Invalidation bumps a generation counter before clearing entries. A
//!   resolution only stores its result if the generation it observed before
//!   reading the store is still current, so a result computed from
//!   pre-mutation state cannot land in the cache after the mutation returns.
//! - Fan-out for role-level changes enumerates holders from the store, never
//!   from cached entries.
use super::cache::ExpiringCache;
use super::error::{AuthzError, AuthzResult};
use crate::model::{MenuTreeNode, Permission};
use crate::store::GrantStore;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub type PermissionSet = Arc<BTreeSet<String>>;
pub type MenuForest = Arc<Vec<MenuTreeNode>>;

const PERMISSIONS_PREFIX: &str = "user_permissions:";
const MENU_PREFIX: &str = "user_menu:";

pub fn permissions_cache_key(principal_id: &str) -> String {
    format!("{PERMISSIONS_PREFIX}{principal_id}")
}

pub fn menu_cache_key(principal_id: &str) -> String {
    format!("{MENU_PREFIX}{principal_id}")
}

#[derive(Clone)]
pub struct AuthorizationResolver {
    store: Arc<dyn GrantStore>,
    permissions: ExpiringCache<PermissionSet>,
    menus: ExpiringCache<MenuForest>,
    ttl: Duration,
    generation: Arc<AtomicU64>,
}

impl AuthorizationResolver {
    pub fn new(store: Arc<dyn GrantStore>, ttl: Duration) -> Self {
        Self {
            store,
            permissions: ExpiringCache::new("permissions"),
            menus: ExpiringCache::new("menus"),
            ttl,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Starts the expiry sweep for both per-principal caches.
    pub fn spawn_sweepers(&self, interval: Duration) -> Vec<tokio::task::JoinHandle<()>> {
        vec![
            self.permissions.spawn_sweeper(interval),
            self.menus.spawn_sweeper(interval),
        ]
    }

    pub async fn resolve_permissions(&self, principal_id: &str) -> AuthzResult<PermissionSet> {
        let key = permissions_cache_key(principal_id);
        if let Some(cached) = self.permissions.get(&key).await {
            return Ok(cached);
        }

        let observed = self.generation();
        let resolved = Arc::new(self.load_permissions(principal_id).await.inspect_err(
            |err| tracing::warn!(principal_id, error = %err, "permission resolution failed"),
        )?);
        let stored = self
            .permissions
            .set_if(key, Arc::clone(&resolved), self.ttl, || {
                self.generation() == observed
            })
            .await;
        if !stored {
            tracing::debug!(principal_id, "skipped caching permissions resolved across an invalidation");
        }
        Ok(resolved)
    }

    async fn load_permissions(&self, principal_id: &str) -> AuthzResult<BTreeSet<String>> {
        let roles: Vec<String> = self
            .store
            .principal_role_keys(principal_id)
            .await
            .map_err(AuthzError::from)?
            .into_iter()
            .collect();
        if roles.is_empty() {
            return Ok(BTreeSet::new());
        }
        Ok(self.store.role_permission_keys(&roles).await?)
    }

    /// Membership test against the resolved set. Callers must treat `Err` as a denial.
    pub async fn check_permission(
        &self,
        principal_id: &str,
        permission_key: &str,
    ) -> AuthzResult<bool> {
        let outcome = self
            .resolve_permissions(principal_id)
            .await
            .map(|set| set.contains(permission_key));
        let result = match &outcome {
            Ok(true) => "allowed",
            Ok(false) => "denied",
            Err(_) => "error",
        };
        metrics::counter!("warden_permission_checks_total", "result" => result).increment(1);
        outcome
    }

    /// Full records for the resolved set, optionally filtered by permission type.
    ///
    /// Keys granted to a role but missing from the catalog are dropped.
    pub async fn list_permissions(
        &self,
        principal_id: &str,
        kind: Option<&str>,
    ) -> AuthzResult<Vec<Permission>> {
        let set = self.resolve_permissions(principal_id).await?;
        if set.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = set.iter().cloned().collect();
        Ok(self.store.get_permissions(&keys, kind).await?)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub async fn invalidate_principal(&self, principal_id: &str) {
        self.bump();
        self.permissions
            .delete(&permissions_cache_key(principal_id))
            .await;
        self.menus.delete(&menu_cache_key(principal_id)).await;
    }

    pub async fn invalidate_principals(&self, principal_ids: &[String]) {
        self.bump();
        for principal_id in principal_ids {
            self.permissions
                .delete(&permissions_cache_key(principal_id))
                .await;
            self.menus.delete(&menu_cache_key(principal_id)).await;
        }
        tracing::debug!(count = principal_ids.len(), "invalidated cached grants");
    }

    /// Invalidates every current holder of `role_key`.
    ///
    /// If the holders cannot be enumerated the whole cache is dropped instead.
    pub async fn invalidate_role_holders(&self, role_key: &str) {
        match self.store.principals_with_role(role_key).await {
            Ok(holders) => self.invalidate_principals(&holders).await,
            Err(err) => {
                tracing::warn!(role_key, error = %err, "holder enumeration failed; clearing permission cache");
                self.invalidate_all().await;
            }
        }
    }

    pub async fn invalidate_all(&self) {
        self.bump();
        self.permissions.clear().await;
        self.menus.clear().await;
    }

    /// Drops every cached visible menu; permission sets stay valid.
    pub async fn invalidate_menus(&self) {
        self.bump();
        self.menus.delete_prefix(MENU_PREFIX).await;
    }

    pub async fn cached_menu(&self, principal_id: &str) -> Option<MenuForest> {
        self.menus.get(&menu_cache_key(principal_id)).await
    }

    /// Stores a derived menu unless an invalidation happened after `observed`.
    pub async fn cache_menu(&self, principal_id: &str, forest: MenuForest, observed: u64) -> bool {
        self.menus
            .set_if(menu_cache_key(principal_id), forest, self.ttl, || {
                self.generation() == observed
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use crate::store::StoreConfig;

    fn store() -> Arc<InMemoryStore> {
        Arc::new(InMemoryStore::new(StoreConfig {
            changes_limit: 10,
            change_retention_max_rows: None,
        }))
    }

    fn keys(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[tokio::test]
    async fn principal_without_roles_resolves_empty() {
        let resolver = AuthorizationResolver::new(store(), Duration::from_secs(60));
        let set = resolver.resolve_permissions("nobody").await.expect("resolve");
        assert!(set.is_empty());
        assert!(!resolver.check_permission("nobody", "report:view").await.expect("check"));
    }

    #[tokio::test]
    async fn resolution_is_union_over_roles_and_cached() {
        let store = store();
        store
            .add_role_permissions("analyst", &keys(&["report:view"]))
            .await
            .expect("grant");
        store
            .add_role_permissions("exporter", &keys(&["report:export", "report:view"]))
            .await
            .expect("grant");
        store
            .add_principal_roles("u1", &keys(&["analyst", "exporter"]))
            .await
            .expect("assign");
        let resolver = AuthorizationResolver::new(store.clone(), Duration::from_secs(60));

        let set = resolver.resolve_permissions("u1").await.expect("resolve");
        assert_eq!(*set, BTreeSet::from(["report:export".to_string(), "report:view".to_string()]));

        // Mutating the store without invalidating keeps serving the memoized set.
        store
            .remove_principal_roles("u1", &keys(&["exporter"]))
            .await
            .expect("unassign");
        assert!(resolver.check_permission("u1", "report:export").await.expect("check"));

        resolver.invalidate_principal("u1").await;
        assert!(!resolver.check_permission("u1", "report:export").await.expect("check"));
    }

    #[tokio::test]
    async fn role_holder_fanout_uses_store_membership() {
        let store = store();
        store
            .add_role_permissions("analyst", &keys(&["report:view"]))
            .await
            .expect("grant");
        for principal in ["u1", "u2"] {
            store
                .add_principal_roles(principal, &keys(&["analyst"]))
                .await
                .expect("assign");
        }
        let resolver = AuthorizationResolver::new(store.clone(), Duration::from_secs(60));
        // Only u1 has a cached entry; u2 must still be covered by the fan-out.
        assert!(resolver.check_permission("u1", "report:view").await.expect("check"));

        store
            .remove_role_permissions("analyst", &keys(&["report:view"]))
            .await
            .expect("revoke");
        resolver.invalidate_role_holders("analyst").await;

        for principal in ["u1", "u2"] {
            assert!(!resolver.check_permission(principal, "report:view").await.expect("check"));
        }
    }

    #[tokio::test]
    async fn stale_resolution_is_not_cached_across_invalidation() {
        let store = store();
        let resolver = AuthorizationResolver::new(store.clone(), Duration::from_secs(60));
        let observed = resolver.generation();
        resolver.invalidate_principal("u1").await;
        let forest: MenuForest = Arc::new(Vec::new());
        assert!(!resolver.cache_menu("u1", forest.clone(), observed).await);
        assert!(resolver.cached_menu("u1").await.is_none());
        assert!(resolver.cache_menu("u1", forest, resolver.generation()).await);
        assert!(resolver.cached_menu("u1").await.is_some());
    }

    #[tokio::test]
    async fn list_permissions_hydrates_and_filters() {
        let store = store();
        let now = chrono::Utc::now();
        for (key, kind) in [("report:view", "api"), ("menu:reports", "menu")] {
            store
                .create_permission(Permission {
                    key: key.to_string(),
                    name: key.to_string(),
                    kind: kind.to_string(),
                    description: String::new(),
                    created_at: now,
                    updated_at: now,
                })
                .await
                .expect("permission");
        }
        store
            .add_role_permissions("analyst", &keys(&["report:view", "menu:reports", "orphan:key"]))
            .await
            .expect("grant");
        store
            .add_principal_roles("u1", &keys(&["analyst"]))
            .await
            .expect("assign");
        let resolver = AuthorizationResolver::new(store, Duration::from_secs(60));

        let all = resolver.list_permissions("u1", None).await.expect("list");
        assert_eq!(all.len(), 2);
        let api = resolver.list_permissions("u1", Some("api")).await.expect("list");
        assert_eq!(api.len(), 1);
        assert_eq!(api[0].key, "report:view");
    }
}
