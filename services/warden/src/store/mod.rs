//! Persistence traits for the grant graph, menu tree, and change history.
//!
//! # Purpose
//! The grant store is the leaf dependency of the authorization stack. Two
//! backends implement these traits: an in-memory store for development and
//! tests, and a Postgres store for durable deployments.
//!
//! # Notes
//! Edge creation is idempotent at this layer (`add_*` ignores pairs that
//! already exist) so services can compute set differences without racing
//! on unique constraints.
use crate::model::{ChangeQuery, ChangeRecord, MenuNode, Permission, Role};
use async_trait::async_trait;
use std::collections::BTreeSet;
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Upper bound on records returned by one change query.
    pub changes_limit: u64,
    /// Retained change records; `None` keeps at least `changes_limit`.
    pub change_retention_max_rows: Option<i64>,
}

impl StoreConfig {
    pub fn change_window(&self) -> usize {
        self.change_retention_max_rows
            .unwrap_or(self.changes_limit as i64)
            .max(self.changes_limit as i64) as usize
    }
}

/// One-based page request. Out-of-range values are clamped by [`PageRequest::normalized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn normalized(self) -> Self {
        let page = self.page.max(1);
        let page_size = match self.page_size {
            0 => DEFAULT_PAGE_SIZE,
            size => size.min(MAX_PAGE_SIZE),
        };
        Self { page, page_size }
    }

    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.page_size as usize
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone)]
pub struct ChangeSet<T> {
    pub items: Vec<T>,
    pub next_seq: u64,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unexpected(err.into())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Unexpected(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Roles, permissions, and the two edge sets between them and principals.
#[async_trait]
pub trait GrantStore: Send + Sync {
    async fn get_role(&self, role_key: &str) -> StoreResult<Option<Role>>;
    async fn get_roles(&self, role_keys: &[String]) -> StoreResult<Vec<Role>>;
    async fn list_roles(&self, page: PageRequest) -> StoreResult<Page<Role>>;
    async fn create_role(&self, role: Role) -> StoreResult<Role>;
    async fn update_role(&self, role: Role) -> StoreResult<Role>;
    async fn delete_role(&self, role_key: &str) -> StoreResult<()>;

    async fn get_permission(&self, permission_key: &str) -> StoreResult<Option<Permission>>;
    /// Hydrates keys into records. Unknown keys are skipped.
    async fn get_permissions(
        &self,
        permission_keys: &[String],
        kind: Option<&str>,
    ) -> StoreResult<Vec<Permission>>;
    async fn list_permissions(
        &self,
        page: PageRequest,
        kind: Option<&str>,
    ) -> StoreResult<Page<Permission>>;
    async fn create_permission(&self, permission: Permission) -> StoreResult<Permission>;
    async fn update_permission(&self, permission: Permission) -> StoreResult<Permission>;
    async fn delete_permission(&self, permission_key: &str) -> StoreResult<()>;

    /// Union of permission keys granted to any of `role_keys`.
    async fn role_permission_keys(&self, role_keys: &[String]) -> StoreResult<BTreeSet<String>>;
    async fn roles_granting_permission(&self, permission_key: &str) -> StoreResult<Vec<String>>;
    async fn add_role_permissions(&self, role_key: &str, permission_keys: &[String])
    -> StoreResult<()>;
    async fn remove_role_permissions(
        &self,
        role_key: &str,
        permission_keys: &[String],
    ) -> StoreResult<u64>;
    async fn clear_role_permissions(&self, role_key: &str) -> StoreResult<()>;
    /// Removes every grant of the permission; returns the roles that held it.
    async fn clear_permission_grants(&self, permission_key: &str) -> StoreResult<Vec<String>>;

    async fn principal_role_keys(&self, principal_id: &str) -> StoreResult<BTreeSet<String>>;
    async fn principals_with_role(&self, role_key: &str) -> StoreResult<Vec<String>>;
    async fn add_principal_roles(&self, principal_id: &str, role_keys: &[String])
    -> StoreResult<()>;
    async fn remove_principal_roles(
        &self,
        principal_id: &str,
        role_keys: &[String],
    ) -> StoreResult<u64>;
    /// Removes every assignment of the role; returns the principals that held it.
    async fn clear_role_assignments(&self, role_key: &str) -> StoreResult<Vec<String>>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}

/// Flat storage for menu nodes. Tree rules are enforced above this layer.
#[async_trait]
pub trait MenuStore: Send + Sync {
    async fn list_menu_nodes(&self) -> StoreResult<Vec<MenuNode>>;
    async fn get_menu_node(&self, id: &str) -> StoreResult<Option<MenuNode>>;
    async fn create_menu_node(&self, node: MenuNode) -> StoreResult<MenuNode>;
    async fn update_menu_node(&self, node: MenuNode) -> StoreResult<MenuNode>;
    async fn delete_menu_node(&self, id: &str) -> StoreResult<()>;
}

/// Append-only persisted change history.
#[async_trait]
pub trait ChangeStore: Send + Sync {
    async fn append_change(&self, record: ChangeRecord) -> StoreResult<u64>;
    async fn list_changes(&self, query: &ChangeQuery) -> StoreResult<ChangeSet<ChangeRecord>>;
}

pub trait WardenStore: GrantStore + MenuStore + ChangeStore {}

impl<T> WardenStore for T where T: GrantStore + MenuStore + ChangeStore {}
