//! In-memory implementation of the warden stores.
//!
//! # Purpose
//! Implements [`GrantStore`], [`MenuStore`], and [`ChangeStore`] with
//! `HashMap`s guarded by `tokio::sync::RwLock`. It exists for:
//! - local development and tests (no external dependencies)
//! - deployments where losing grants on restart is acceptable
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - **Single-process consistency**: every call observes all writes that
//!   completed before it. Writers take the write lock of each map they touch.
//! - **No multi-node coordination**: replicas each hold independent state.
//!
//! # Edges
//! Role grants and principal assignments are adjacency sets keyed by the
//! source (`role -> {permission}`, `principal -> {role}`). Reverse lookups
//! scan the map, which is fine at development scale.
//!
//! # Metrics
//! Gauges track role, permission, and menu node counts so dashboards look the
//! same across backends.
use super::{
    ChangeSet, ChangeStore, GrantStore, MenuStore, Page, PageRequest, StoreConfig, StoreError,
    StoreResult,
};
use crate::model::{ChangeQuery, ChangeRecord, MenuNode, Permission, Role};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Bounded, append-only log of change records.
///
/// `record()` assigns the next sequence number and evicts the oldest entries
/// once `capacity` is exceeded.
#[derive(Debug)]
struct ChangeLog<T> {
    next_seq: u64,
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> ChangeLog<T> {
    fn new(capacity: usize) -> Self {
        Self {
            next_seq: 0,
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    fn record(&mut self, item: impl FnOnce(u64) -> T) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.items.push_back(item(seq));
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
        seq
    }
}

pub struct InMemoryStore {
    config: StoreConfig,
    roles: Arc<RwLock<HashMap<String, Role>>>,
    permissions: Arc<RwLock<HashMap<String, Permission>>>,
    /// role key -> granted permission keys
    role_permissions: Arc<RwLock<HashMap<String, BTreeSet<String>>>>,
    /// principal id -> assigned role keys
    principal_roles: Arc<RwLock<HashMap<String, BTreeSet<String>>>>,
    menu_nodes: Arc<RwLock<HashMap<String, MenuNode>>>,
    changes: Arc<RwLock<ChangeLog<ChangeRecord>>>,
}

impl InMemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        let capacity = config.change_window();
        Self {
            config,
            roles: Arc::new(RwLock::new(HashMap::new())),
            permissions: Arc::new(RwLock::new(HashMap::new())),
            role_permissions: Arc::new(RwLock::new(HashMap::new())),
            principal_roles: Arc::new(RwLock::new(HashMap::new())),
            menu_nodes: Arc::new(RwLock::new(HashMap::new())),
            changes: Arc::new(RwLock::new(ChangeLog::new(capacity))),
        }
    }

    fn limit(&self) -> usize {
        self.config.changes_limit as usize
    }
}

fn paginate<T>(items: Vec<T>, page: PageRequest) -> Page<T> {
    let page = page.normalized();
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(page.offset())
        .take(page.page_size as usize)
        .collect();
    Page {
        items,
        total,
        page: page.page,
        page_size: page.page_size,
    }
}

#[async_trait]
impl GrantStore for InMemoryStore {
    async fn get_role(&self, role_key: &str) -> StoreResult<Option<Role>> {
        Ok(self.roles.read().await.get(role_key).cloned())
    }

    async fn get_roles(&self, role_keys: &[String]) -> StoreResult<Vec<Role>> {
        let roles = self.roles.read().await;
        Ok(role_keys
            .iter()
            .filter_map(|key| roles.get(key).cloned())
            .collect())
    }

    async fn list_roles(&self, page: PageRequest) -> StoreResult<Page<Role>> {
        let mut items: Vec<Role> = self.roles.read().await.values().cloned().collect();
        items.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(paginate(items, page))
    }

    async fn create_role(&self, role: Role) -> StoreResult<Role> {
        let mut roles = self.roles.write().await;
        if roles.contains_key(&role.key) {
            return Err(StoreError::Conflict("role exists".into()));
        }
        roles.insert(role.key.clone(), role.clone());
        metrics::gauge!("warden_roles_total").set(roles.len() as f64);
        Ok(role)
    }

    async fn update_role(&self, role: Role) -> StoreResult<Role> {
        let mut roles = self.roles.write().await;
        match roles.get_mut(&role.key) {
            Some(existing) => {
                *existing = role.clone();
                Ok(role)
            }
            None => Err(StoreError::NotFound("role".into())),
        }
    }

    async fn delete_role(&self, role_key: &str) -> StoreResult<()> {
        let mut roles = self.roles.write().await;
        if roles.remove(role_key).is_none() {
            return Err(StoreError::NotFound("role".into()));
        }
        metrics::gauge!("warden_roles_total").set(roles.len() as f64);
        Ok(())
    }

    async fn get_permission(&self, permission_key: &str) -> StoreResult<Option<Permission>> {
        Ok(self.permissions.read().await.get(permission_key).cloned())
    }

    async fn get_permissions(
        &self,
        permission_keys: &[String],
        kind: Option<&str>,
    ) -> StoreResult<Vec<Permission>> {
        let permissions = self.permissions.read().await;
        Ok(permission_keys
            .iter()
            .filter_map(|key| permissions.get(key))
            .filter(|permission| kind.is_none_or(|kind| permission.kind == kind))
            .cloned()
            .collect())
    }

    async fn list_permissions(
        &self,
        page: PageRequest,
        kind: Option<&str>,
    ) -> StoreResult<Page<Permission>> {
        let mut items: Vec<Permission> = self
            .permissions
            .read()
            .await
            .values()
            .filter(|permission| kind.is_none_or(|kind| permission.kind == kind))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(paginate(items, page))
    }

    async fn create_permission(&self, permission: Permission) -> StoreResult<Permission> {
        let mut permissions = self.permissions.write().await;
        if permissions.contains_key(&permission.key) {
            return Err(StoreError::Conflict("permission exists".into()));
        }
        permissions.insert(permission.key.clone(), permission.clone());
        metrics::gauge!("warden_permissions_total").set(permissions.len() as f64);
        Ok(permission)
    }

    async fn update_permission(&self, permission: Permission) -> StoreResult<Permission> {
        let mut permissions = self.permissions.write().await;
        match permissions.get_mut(&permission.key) {
            Some(existing) => {
                *existing = permission.clone();
                Ok(permission)
            }
            None => Err(StoreError::NotFound("permission".into())),
        }
    }

    async fn delete_permission(&self, permission_key: &str) -> StoreResult<()> {
        let mut permissions = self.permissions.write().await;
        if permissions.remove(permission_key).is_none() {
            return Err(StoreError::NotFound("permission".into()));
        }
        metrics::gauge!("warden_permissions_total").set(permissions.len() as f64);
        Ok(())
    }

    async fn role_permission_keys(&self, role_keys: &[String]) -> StoreResult<BTreeSet<String>> {
        let grants = self.role_permissions.read().await;
        Ok(role_keys
            .iter()
            .filter_map(|role| grants.get(role))
            .flatten()
            .cloned()
            .collect())
    }

    async fn roles_granting_permission(&self, permission_key: &str) -> StoreResult<Vec<String>> {
        let grants = self.role_permissions.read().await;
        let mut roles: Vec<String> = grants
            .iter()
            .filter(|(_, permissions)| permissions.contains(permission_key))
            .map(|(role, _)| role.clone())
            .collect();
        roles.sort();
        Ok(roles)
    }

    async fn add_role_permissions(
        &self,
        role_key: &str,
        permission_keys: &[String],
    ) -> StoreResult<()> {
        let mut grants = self.role_permissions.write().await;
        grants
            .entry(role_key.to_string())
            .or_default()
            .extend(permission_keys.iter().cloned());
        Ok(())
    }

    async fn remove_role_permissions(
        &self,
        role_key: &str,
        permission_keys: &[String],
    ) -> StoreResult<u64> {
        let mut grants = self.role_permissions.write().await;
        let Some(held) = grants.get_mut(role_key) else {
            return Ok(0);
        };
        let removed = permission_keys
            .iter()
            .filter(|key| held.remove(key.as_str()))
            .count();
        if held.is_empty() {
            grants.remove(role_key);
        }
        Ok(removed as u64)
    }

    async fn clear_role_permissions(&self, role_key: &str) -> StoreResult<()> {
        self.role_permissions.write().await.remove(role_key);
        Ok(())
    }

    async fn clear_permission_grants(&self, permission_key: &str) -> StoreResult<Vec<String>> {
        let mut grants = self.role_permissions.write().await;
        let mut roles: Vec<String> = grants
            .iter_mut()
            .filter_map(|(role_key, held)| held.remove(permission_key).then(|| role_key.clone()))
            .collect();
        grants.retain(|_, held| !held.is_empty());
        roles.sort();
        Ok(roles)
    }

    async fn principal_role_keys(&self, principal_id: &str) -> StoreResult<BTreeSet<String>> {
        Ok(self
            .principal_roles
            .read()
            .await
            .get(principal_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn principals_with_role(&self, role_key: &str) -> StoreResult<Vec<String>> {
        let assignments = self.principal_roles.read().await;
        let mut principals: Vec<String> = assignments
            .iter()
            .filter(|(_, roles)| roles.contains(role_key))
            .map(|(principal, _)| principal.clone())
            .collect();
        principals.sort();
        Ok(principals)
    }

    async fn add_principal_roles(
        &self,
        principal_id: &str,
        role_keys: &[String],
    ) -> StoreResult<()> {
        let mut assignments = self.principal_roles.write().await;
        assignments
            .entry(principal_id.to_string())
            .or_default()
            .extend(role_keys.iter().cloned());
        Ok(())
    }

    async fn remove_principal_roles(
        &self,
        principal_id: &str,
        role_keys: &[String],
    ) -> StoreResult<u64> {
        let mut assignments = self.principal_roles.write().await;
        let Some(held) = assignments.get_mut(principal_id) else {
            return Ok(0);
        };
        let removed = role_keys
            .iter()
            .filter(|key| held.remove(key.as_str()))
            .count();
        if held.is_empty() {
            assignments.remove(principal_id);
        }
        Ok(removed as u64)
    }

    async fn clear_role_assignments(&self, role_key: &str) -> StoreResult<Vec<String>> {
        let mut assignments = self.principal_roles.write().await;
        let mut principals: Vec<String> = assignments
            .iter_mut()
            .filter_map(|(principal_id, held)| held.remove(role_key).then(|| principal_id.clone()))
            .collect();
        assignments.retain(|_, held| !held.is_empty());
        principals.sort();
        Ok(principals)
    }

    async fn health_check(&self) -> StoreResult<()> {
        // Always healthy while the process is running.
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl MenuStore for InMemoryStore {
    async fn list_menu_nodes(&self) -> StoreResult<Vec<MenuNode>> {
        let mut nodes: Vec<MenuNode> = self.menu_nodes.read().await.values().cloned().collect();
        nodes.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.path.cmp(&b.path)));
        Ok(nodes)
    }

    async fn get_menu_node(&self, id: &str) -> StoreResult<Option<MenuNode>> {
        Ok(self.menu_nodes.read().await.get(id).cloned())
    }

    async fn create_menu_node(&self, node: MenuNode) -> StoreResult<MenuNode> {
        let mut nodes = self.menu_nodes.write().await;
        if nodes.contains_key(&node.id) {
            return Err(StoreError::Conflict("menu node exists".into()));
        }
        if nodes.values().any(|existing| existing.path == node.path) {
            return Err(StoreError::Conflict("menu path exists".into()));
        }
        nodes.insert(node.id.clone(), node.clone());
        metrics::gauge!("warden_menu_nodes_total").set(nodes.len() as f64);
        Ok(node)
    }

    async fn update_menu_node(&self, node: MenuNode) -> StoreResult<MenuNode> {
        let mut nodes = self.menu_nodes.write().await;
        if !nodes.contains_key(&node.id) {
            return Err(StoreError::NotFound("menu node".into()));
        }
        if nodes
            .values()
            .any(|existing| existing.id != node.id && existing.path == node.path)
        {
            return Err(StoreError::Conflict("menu path exists".into()));
        }
        nodes.insert(node.id.clone(), node.clone());
        Ok(node)
    }

    async fn delete_menu_node(&self, id: &str) -> StoreResult<()> {
        let mut nodes = self.menu_nodes.write().await;
        if nodes.remove(id).is_none() {
            return Err(StoreError::NotFound("menu node".into()));
        }
        metrics::gauge!("warden_menu_nodes_total").set(nodes.len() as f64);
        Ok(())
    }
}

#[async_trait]
impl ChangeStore for InMemoryStore {
    async fn append_change(&self, record: ChangeRecord) -> StoreResult<u64> {
        Ok(self
            .changes
            .write()
            .await
            .record(|seq| ChangeRecord { seq, ..record }))
    }

    async fn list_changes(&self, query: &ChangeQuery) -> StoreResult<ChangeSet<ChangeRecord>> {
        let limit = match query.limit {
            0 => self.limit(),
            requested => requested.min(self.limit()),
        };
        let guard = self.changes.read().await;
        let items: Vec<ChangeRecord> = guard
            .items
            .iter()
            .filter(|record| query.matches(record))
            .take(limit)
            .cloned()
            .collect();
        // A full page resumes right after its last record; otherwise the caller is caught up.
        let next_seq = match items.last() {
            Some(last) if items.len() == limit => last.seq + 1,
            _ => guard.next_seq,
        };
        Ok(ChangeSet { items, next_seq })
    }
}
