#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use warden::app::{AppState, StateOptions};
use warden::audit::TracingChangeSink;
use warden::authz::AuthorizationResolver;
use warden::model::{ChangeQuery, ChangeRecord, MenuNode, Permission, Role};
use warden::principal::{PrincipalDirectory, StaticPrincipalDirectory};
use warden::store::memory::InMemoryStore;
use warden::store::{
    ChangeSet, ChangeStore, GrantStore, MenuStore, Page, PageRequest, StoreConfig, StoreError,
    StoreResult,
};

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub fn memory_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::new(StoreConfig {
        changes_limit: warden::config::DEFAULT_CHANGES_LIMIT,
        change_retention_max_rows: Some(warden::config::DEFAULT_CHANGE_RETENTION_MAX_ROWS),
    }))
}

pub fn app_state(directory: Arc<dyn PrincipalDirectory>, options: StateOptions) -> AppState {
    AppState::assemble(memory_store(), directory, Arc::new(TracingChangeSink), options)
}

pub fn default_state() -> AppState {
    app_state(
        Arc::new(StaticPrincipalDirectory::allow_all()),
        StateOptions::default(),
    )
}

/// Delegates to an in-memory store, but fails grant reads while `outage` is set.
pub struct FlakyStore {
    inner: InMemoryStore,
    outage: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryStore::new(StoreConfig {
                changes_limit: 100,
                change_retention_max_rows: None,
            }),
            outage: AtomicBool::new(false),
        }
    }

    pub fn set_outage(&self, down: bool) {
        self.outage.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.outage.load(Ordering::SeqCst) {
            return Err(StoreError::Unexpected(anyhow::anyhow!("connection refused")));
        }
        Ok(())
    }
}

#[async_trait]
impl GrantStore for FlakyStore {
    async fn get_role(&self, role_key: &str) -> StoreResult<Option<Role>> {
        self.inner.get_role(role_key).await
    }
    async fn get_roles(&self, role_keys: &[String]) -> StoreResult<Vec<Role>> {
        self.inner.get_roles(role_keys).await
    }
    async fn list_roles(&self, page: PageRequest) -> StoreResult<Page<Role>> {
        self.inner.list_roles(page).await
    }
    async fn create_role(&self, role: Role) -> StoreResult<Role> {
        self.inner.create_role(role).await
    }
    async fn update_role(&self, role: Role) -> StoreResult<Role> {
        self.inner.update_role(role).await
    }
    async fn delete_role(&self, role_key: &str) -> StoreResult<()> {
        self.inner.delete_role(role_key).await
    }
    async fn get_permission(&self, permission_key: &str) -> StoreResult<Option<Permission>> {
        self.inner.get_permission(permission_key).await
    }
    async fn get_permissions(
        &self,
        permission_keys: &[String],
        kind: Option<&str>,
    ) -> StoreResult<Vec<Permission>> {
        self.inner.get_permissions(permission_keys, kind).await
    }
    async fn list_permissions(
        &self,
        page: PageRequest,
        kind: Option<&str>,
    ) -> StoreResult<Page<Permission>> {
        self.inner.list_permissions(page, kind).await
    }
    async fn create_permission(&self, permission: Permission) -> StoreResult<Permission> {
        self.inner.create_permission(permission).await
    }
    async fn update_permission(&self, permission: Permission) -> StoreResult<Permission> {
        self.inner.update_permission(permission).await
    }
    async fn delete_permission(&self, permission_key: &str) -> StoreResult<()> {
        self.inner.delete_permission(permission_key).await
    }
    async fn role_permission_keys(&self, role_keys: &[String]) -> StoreResult<BTreeSet<String>> {
        self.check()?;
        self.inner.role_permission_keys(role_keys).await
    }
    async fn roles_granting_permission(&self, permission_key: &str) -> StoreResult<Vec<String>> {
        self.inner.roles_granting_permission(permission_key).await
    }
    async fn add_role_permissions(
        &self,
        role_key: &str,
        permission_keys: &[String],
    ) -> StoreResult<()> {
        self.inner.add_role_permissions(role_key, permission_keys).await
    }
    async fn remove_role_permissions(
        &self,
        role_key: &str,
        permission_keys: &[String],
    ) -> StoreResult<u64> {
        self.inner.remove_role_permissions(role_key, permission_keys).await
    }
    async fn clear_role_permissions(&self, role_key: &str) -> StoreResult<()> {
        self.inner.clear_role_permissions(role_key).await
    }
    async fn clear_permission_grants(&self, permission_key: &str) -> StoreResult<Vec<String>> {
        self.inner.clear_permission_grants(permission_key).await
    }
    async fn principal_role_keys(&self, principal_id: &str) -> StoreResult<BTreeSet<String>> {
        self.check()?;
        self.inner.principal_role_keys(principal_id).await
    }
    async fn principals_with_role(&self, role_key: &str) -> StoreResult<Vec<String>> {
        self.inner.principals_with_role(role_key).await
    }
    async fn add_principal_roles(&self, principal_id: &str, role_keys: &[String]) -> StoreResult<()> {
        self.inner.add_principal_roles(principal_id, role_keys).await
    }
    async fn remove_principal_roles(
        &self,
        principal_id: &str,
        role_keys: &[String],
    ) -> StoreResult<u64> {
        self.inner.remove_principal_roles(principal_id, role_keys).await
    }
    async fn clear_role_assignments(&self, role_key: &str) -> StoreResult<Vec<String>> {
        self.inner.clear_role_assignments(role_key).await
    }
    async fn health_check(&self) -> StoreResult<()> {
        self.check()
    }
    fn is_durable(&self) -> bool {
        false
    }
    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}

#[async_trait]
impl MenuStore for FlakyStore {
    async fn list_menu_nodes(&self) -> StoreResult<Vec<MenuNode>> {
        self.inner.list_menu_nodes().await
    }
    async fn get_menu_node(&self, id: &str) -> StoreResult<Option<MenuNode>> {
        self.inner.get_menu_node(id).await
    }
    async fn create_menu_node(&self, node: MenuNode) -> StoreResult<MenuNode> {
        self.inner.create_menu_node(node).await
    }
    async fn update_menu_node(&self, node: MenuNode) -> StoreResult<MenuNode> {
        self.inner.update_menu_node(node).await
    }
    async fn delete_menu_node(&self, id: &str) -> StoreResult<()> {
        self.inner.delete_menu_node(id).await
    }
}

#[async_trait]
impl ChangeStore for FlakyStore {
    async fn append_change(&self, record: ChangeRecord) -> StoreResult<u64> {
        self.inner.append_change(record).await
    }
    async fn list_changes(&self, query: &ChangeQuery) -> StoreResult<ChangeSet<ChangeRecord>> {
        self.inner.list_changes(query).await
    }
}

/// Delegates to an in-memory store, but when a delete clears edges it first
/// gives `late_principal` access through the doomed edge and warms its cache,
/// as a concurrent request landing between holder enumeration and the delete
/// would.
pub struct InterleavingStore {
    inner: Arc<InMemoryStore>,
    resolver: OnceLock<AuthorizationResolver>,
    late_principal: String,
    late_role: String,
}

impl InterleavingStore {
    pub fn new(inner: Arc<InMemoryStore>, late_principal: &str, late_role: &str) -> Self {
        Self {
            inner,
            resolver: OnceLock::new(),
            late_principal: late_principal.to_string(),
            late_role: late_role.to_string(),
        }
    }

    /// The resolver whose cache the interleaved request warms.
    pub fn interleave_with(&self, resolver: AuthorizationResolver) {
        let _ = self.resolver.set(resolver);
    }

    async fn warm(&self, role_key: &str) {
        let Some(resolver) = self.resolver.get() else {
            return;
        };
        self.inner
            .add_principal_roles(&self.late_principal, &[role_key.to_string()])
            .await
            .expect("late assign");
        resolver.invalidate_principal(&self.late_principal).await;
        resolver
            .resolve_permissions(&self.late_principal)
            .await
            .expect("late resolve");
    }
}

#[async_trait]
impl GrantStore for InterleavingStore {
    async fn get_role(&self, role_key: &str) -> StoreResult<Option<Role>> {
        self.inner.get_role(role_key).await
    }
    async fn get_roles(&self, role_keys: &[String]) -> StoreResult<Vec<Role>> {
        self.inner.get_roles(role_keys).await
    }
    async fn list_roles(&self, page: PageRequest) -> StoreResult<Page<Role>> {
        self.inner.list_roles(page).await
    }
    async fn create_role(&self, role: Role) -> StoreResult<Role> {
        self.inner.create_role(role).await
    }
    async fn update_role(&self, role: Role) -> StoreResult<Role> {
        self.inner.update_role(role).await
    }
    async fn delete_role(&self, role_key: &str) -> StoreResult<()> {
        self.inner.delete_role(role_key).await
    }
    async fn get_permission(&self, permission_key: &str) -> StoreResult<Option<Permission>> {
        self.inner.get_permission(permission_key).await
    }
    async fn get_permissions(
        &self,
        permission_keys: &[String],
        kind: Option<&str>,
    ) -> StoreResult<Vec<Permission>> {
        self.inner.get_permissions(permission_keys, kind).await
    }
    async fn list_permissions(
        &self,
        page: PageRequest,
        kind: Option<&str>,
    ) -> StoreResult<Page<Permission>> {
        self.inner.list_permissions(page, kind).await
    }
    async fn create_permission(&self, permission: Permission) -> StoreResult<Permission> {
        self.inner.create_permission(permission).await
    }
    async fn update_permission(&self, permission: Permission) -> StoreResult<Permission> {
        self.inner.update_permission(permission).await
    }
    async fn delete_permission(&self, permission_key: &str) -> StoreResult<()> {
        self.inner.delete_permission(permission_key).await
    }
    async fn role_permission_keys(&self, role_keys: &[String]) -> StoreResult<BTreeSet<String>> {
        self.inner.role_permission_keys(role_keys).await
    }
    async fn roles_granting_permission(&self, permission_key: &str) -> StoreResult<Vec<String>> {
        self.inner.roles_granting_permission(permission_key).await
    }
    async fn add_role_permissions(
        &self,
        role_key: &str,
        permission_keys: &[String],
    ) -> StoreResult<()> {
        self.inner.add_role_permissions(role_key, permission_keys).await
    }
    async fn remove_role_permissions(
        &self,
        role_key: &str,
        permission_keys: &[String],
    ) -> StoreResult<u64> {
        self.inner.remove_role_permissions(role_key, permission_keys).await
    }
    async fn clear_role_permissions(&self, role_key: &str) -> StoreResult<()> {
        self.inner.clear_role_permissions(role_key).await
    }
    async fn clear_permission_grants(&self, permission_key: &str) -> StoreResult<Vec<String>> {
        self.inner
            .add_role_permissions(&self.late_role, &[permission_key.to_string()])
            .await?;
        self.warm(&self.late_role).await;
        self.inner.clear_permission_grants(permission_key).await
    }
    async fn principal_role_keys(&self, principal_id: &str) -> StoreResult<BTreeSet<String>> {
        self.inner.principal_role_keys(principal_id).await
    }
    async fn principals_with_role(&self, role_key: &str) -> StoreResult<Vec<String>> {
        self.inner.principals_with_role(role_key).await
    }
    async fn add_principal_roles(&self, principal_id: &str, role_keys: &[String]) -> StoreResult<()> {
        self.inner.add_principal_roles(principal_id, role_keys).await
    }
    async fn remove_principal_roles(
        &self,
        principal_id: &str,
        role_keys: &[String],
    ) -> StoreResult<u64> {
        self.inner.remove_principal_roles(principal_id, role_keys).await
    }
    async fn clear_role_assignments(&self, role_key: &str) -> StoreResult<Vec<String>> {
        self.warm(role_key).await;
        self.inner.clear_role_assignments(role_key).await
    }
    async fn health_check(&self) -> StoreResult<()> {
        self.inner.health_check().await
    }
    fn is_durable(&self) -> bool {
        false
    }
    fn backend_name(&self) -> &'static str {
        "interleaving"
    }
}
