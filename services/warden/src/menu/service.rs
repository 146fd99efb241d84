//! Menu tree administration.
//!
//! # Purpose
//! Creates, edits, and removes menu nodes while keeping the tree well formed,
//! and serves the unfiltered tree from a cached snapshot.
//!
//! # Key invariants
//! - Writes are serialized and validated against a snapshot read from the
//!   store inside the critical section, so two concurrent moves cannot
//!   jointly form a cycle.
//! - Every accepted write drops the tree snapshot and every cached
//!   per-principal menu before returning.
use super::tree::MenuIndex;
use super::validator::TreeValidator;
use crate::audit::ChangeSink;
use crate::authz::keys::validate_permission_key;
use crate::authz::{AuthorizationResolver, AuthzError, AuthzResult, ExpiringCache};
use crate::model::{
    Actor, ChangeAction, ChangeRecord, MenuNode, MenuNodePatch, MenuTreeNode, NewMenuNode,
    TargetType,
};
use crate::store::{GrantStore, MenuStore};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

const TREE_CACHE_KEY: &str = "menu_tree";

#[derive(Clone)]
pub struct MenuService {
    store: Arc<dyn MenuStore>,
    permissions: Arc<dyn GrantStore>,
    resolver: AuthorizationResolver,
    sink: Arc<dyn ChangeSink>,
    validator: TreeValidator,
    tree: ExpiringCache<Arc<MenuIndex>>,
    tree_generation: Arc<AtomicU64>,
    write_lock: Arc<Mutex<()>>,
}

impl MenuService {
    pub fn new(
        store: Arc<dyn MenuStore>,
        permissions: Arc<dyn GrantStore>,
        resolver: AuthorizationResolver,
        sink: Arc<dyn ChangeSink>,
        max_depth: usize,
    ) -> Self {
        Self {
            store,
            permissions,
            resolver,
            sink,
            validator: TreeValidator::new(max_depth),
            tree: ExpiringCache::new("menu_tree"),
            tree_generation: Arc::new(AtomicU64::new(0)),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Current tree, served from cache when possible.
    pub async fn snapshot(&self) -> AuthzResult<Arc<MenuIndex>> {
        if let Some(index) = self.tree.get(TREE_CACHE_KEY).await {
            return Ok(index);
        }
        let observed = self.tree_generation.load(Ordering::Acquire);
        let index = Arc::new(MenuIndex::new(self.store.list_menu_nodes().await?));
        self.tree
            .set_if(TREE_CACHE_KEY, Arc::clone(&index), Duration::ZERO, || {
                self.tree_generation.load(Ordering::Acquire) == observed
            })
            .await;
        Ok(index)
    }

    pub async fn get_menu_tree(&self) -> AuthzResult<Vec<MenuTreeNode>> {
        Ok(self.snapshot().await?.forest(|_| true))
    }

    pub async fn get_menu_node(&self, id: &str) -> AuthzResult<MenuNode> {
        self.store
            .get_menu_node(id)
            .await?
            .ok_or_else(|| AuthzError::NotFound(format!("menu node {id}")))
    }

    async fn fresh_index(&self) -> AuthzResult<MenuIndex> {
        Ok(MenuIndex::new(self.store.list_menu_nodes().await?))
    }

    async fn require_guard(&self, guard: Option<&str>) -> AuthzResult<()> {
        let Some(key) = guard else {
            return Ok(());
        };
        if self.permissions.get_permission(key).await?.is_none() {
            return Err(AuthzError::NotFound(format!("permission {key}")));
        }
        Ok(())
    }

    async fn invalidate(&self) {
        self.tree_generation.fetch_add(1, Ordering::AcqRel);
        self.tree.delete(TREE_CACHE_KEY).await;
        self.resolver.invalidate_menus().await;
    }

    fn failed<T>(
        &self,
        actor: &Actor,
        action: ChangeAction,
        target_key: &str,
        err: AuthzError,
    ) -> AuthzResult<T> {
        self.sink.record(ChangeRecord::failure(
            actor,
            action,
            TargetType::Menu,
            target_key,
            err.to_string(),
        ));
        Err(err)
    }

    pub async fn create_menu_node(
        &self,
        actor: &Actor,
        new: NewMenuNode,
    ) -> AuthzResult<MenuNode> {
        if new.name.trim().is_empty() {
            return Err(AuthzError::Validation("name is required".into()));
        }
        let guard = normalize_guard(new.permission_key)?;
        let parent_id = normalize_parent(new.parent_id);

        let _write = self.write_lock.lock().await;
        let index = self.fresh_index().await?;
        self.validator
            .check_create(&index, &new.path, parent_id.as_deref())?;
        self.require_guard(guard.as_deref()).await?;

        let now = Utc::now();
        let node = MenuNode {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            path: new.path,
            icon: new.icon,
            permission_key: guard,
            parent_id,
            order: new.order,
            enabled: new.enabled,
            meta: new.meta,
            created_at: now,
            updated_at: now,
        };
        let path = node.path.clone();
        let node = match self.store.create_menu_node(node).await {
            Ok(node) => node,
            Err(err) => {
                let err = AuthzError::from(err);
                return self.failed(actor, ChangeAction::CreateMenu, &path, err);
            }
        };
        self.invalidate().await;

        tracing::info!(menu_id = %node.id, path = %node.path, actor_id = %actor.id, "menu node created");
        self.sink.record(
            ChangeRecord::success(actor, ChangeAction::CreateMenu, TargetType::Menu, &node.id)
                .with_after(&node),
        );
        Ok(node)
    }

    pub async fn update_menu_node(
        &self,
        actor: &Actor,
        id: &str,
        patch: MenuNodePatch,
    ) -> AuthzResult<MenuNode> {
        let _write = self.write_lock.lock().await;
        let index = self.fresh_index().await?;
        let before = index
            .get(id)
            .cloned()
            .ok_or_else(|| AuthzError::NotFound(format!("menu node {id}")))?;
        let mut node = before.clone();
        patch.apply(&mut node);
        node.parent_id = normalize_parent(node.parent_id.take());
        self.validator
            .check_update(&index, id, &node.path, node.parent_id.as_deref())?;
        node.updated_at = Utc::now();

        let node = match self.store.update_menu_node(node).await {
            Ok(node) => node,
            Err(err) => {
                let err = AuthzError::from(err);
                return self.failed(actor, ChangeAction::UpdateMenu, id, err);
            }
        };
        self.invalidate().await;

        tracing::info!(menu_id = id, actor_id = %actor.id, "menu node updated");
        self.sink.record(
            ChangeRecord::success(actor, ChangeAction::UpdateMenu, TargetType::Menu, id)
                .with_before(&before)
                .with_after(&node),
        );
        Ok(node)
    }

    /// Replaces only the guarding permission; `None` opens the node.
    pub async fn update_menu_node_guard(
        &self,
        actor: &Actor,
        id: &str,
        permission_key: Option<String>,
    ) -> AuthzResult<MenuNode> {
        let guard = normalize_guard(permission_key)?;

        let _write = self.write_lock.lock().await;
        let before = self.get_menu_node(id).await?;
        self.require_guard(guard.as_deref()).await?;
        let mut node = before.clone();
        node.permission_key = guard;
        node.updated_at = Utc::now();

        let node = match self.store.update_menu_node(node).await {
            Ok(node) => node,
            Err(err) => {
                let err = AuthzError::from(err);
                return self.failed(actor, ChangeAction::UpdateMenuPermission, id, err);
            }
        };
        self.invalidate().await;

        self.sink.record(
            ChangeRecord::success(actor, ChangeAction::UpdateMenuPermission, TargetType::Menu, id)
                .with_before(&json!({ "permission_key": before.permission_key }))
                .with_after(&json!({ "permission_key": node.permission_key })),
        );
        Ok(node)
    }

    pub async fn delete_menu_node(&self, actor: &Actor, id: &str) -> AuthzResult<()> {
        let _write = self.write_lock.lock().await;
        let index = self.fresh_index().await?;
        self.validator.check_delete(&index, id)?;
        let before = index.get(id).cloned();

        if let Err(err) = self.store.delete_menu_node(id).await {
            let err = AuthzError::from(err);
            return self.failed(actor, ChangeAction::DeleteMenu, id, err);
        }
        self.invalidate().await;

        tracing::info!(menu_id = id, actor_id = %actor.id, "menu node deleted");
        self.sink.record(
            ChangeRecord::success(actor, ChangeAction::DeleteMenu, TargetType::Menu, id)
                .with_before(&before),
        );
        Ok(())
    }
}

/// Blank guards mean "no guard"; anything else must be a well-formed key.
fn normalize_guard(guard: Option<String>) -> AuthzResult<Option<String>> {
    match guard {
        Some(key) if key.trim().is_empty() => Ok(None),
        Some(key) => {
            validate_permission_key(&key)?;
            Ok(Some(key))
        }
        None => Ok(None),
    }
}

/// A blank parent places the node at the root.
fn normalize_parent(parent_id: Option<String>) -> Option<String> {
    parent_id.filter(|id| !id.trim().is_empty())
}
