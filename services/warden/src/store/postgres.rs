//! Postgres-backed implementation of the warden stores.
//!
//! # What this module is
//! Implements [`GrantStore`], [`MenuStore`], and [`ChangeStore`] on Postgres
//! via `sqlx`, so grants survive restarts and can be shared by replicas.
//! Each replica still caches resolved permission sets locally.
//!
//! # Key invariants
//! - `(role_key, permission_key)` and `(principal_id, role_key)` are primary
//!   keys; edge inserts use `ON CONFLICT DO NOTHING` so duplicates are no-ops.
//! - Edge tables reference roles and permissions without `ON DELETE CASCADE`.
//!   Services remove edges before the node; a delete issued out of order
//!   fails with a foreign-key violation instead of leaving dangling rows.
//! - `menu_nodes.path` is unique; a collision surfaces as `Conflict`.
//! - `change_records` is append-only with a Postgres-assigned `seq`.
//!
//! # Operational notes
//! - Migrations run at startup via `sqlx::migrate!("./migrations")`.
//! - Pool size and acquire timeout are explicit so a database outage fails
//!   requests quickly, which the resolver turns into a denial.
//! - Avoid logging `PostgresConfig::url`; it may carry credentials.
use super::{
    ChangeSet, ChangeStore, GrantStore, MenuStore, Page, PageRequest, StoreConfig, StoreError,
    StoreResult,
};
use crate::config::PostgresConfig;
use crate::model::{ChangeQuery, ChangeRecord, MenuNode, Permission, Role};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

#[cfg(feature = "pg-tests")]
const RETENTION_TICK: Duration = Duration::from_secs(1);
#[cfg(not(feature = "pg-tests"))]
const RETENTION_TICK: Duration = Duration::from_secs(60);

/// Durable warden store backed by Postgres.
///
/// # Errors
/// - Connection and query failures surface as [`StoreError::Unexpected`].
///
/// # Example
/// ```rust,no_run
/// use warden::config::PostgresConfig;
/// use warden::store::{StoreConfig, postgres::PostgresStore};
///
/// async fn open(pg: PostgresConfig, cfg: StoreConfig) {
///     let _ = PostgresStore::connect(&pg, cfg).await;
/// }
/// ```
pub struct PostgresStore {
    pool: PgPool,
    config: StoreConfig,
}

#[derive(Debug, Clone, FromRow)]
struct DbRole {
    key: String,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbPermission {
    key: String,
    name: String,
    kind: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbMenuNode {
    id: String,
    name: String,
    path: String,
    icon: String,
    permission_key: Option<String>,
    parent_id: Option<String>,
    sort_order: i32,
    enabled: bool,
    meta: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Row shape for `change_records`; enum columns are stored as their wire names.
#[derive(Debug, Clone, FromRow)]
struct ChangeRecordRow {
    seq: i64,
    actor_id: String,
    actor_type: String,
    action: String,
    target_type: String,
    target_key: String,
    before: Option<Value>,
    after: Option<Value>,
    status: String,
    details: Option<String>,
    created_at: DateTime<Utc>,
}

const ROLE_COLUMNS: &str = "key, name, description, created_at, updated_at";
const PERMISSION_COLUMNS: &str = "key, name, kind, description, created_at, updated_at";
const MENU_COLUMNS: &str =
    "id, name, path, icon, permission_key, parent_id, sort_order, enabled, meta, created_at, updated_at";

impl PostgresStore {
    /// Connect to Postgres, run migrations, and optionally start change retention.
    ///
    /// # Errors
    /// - Connection timeout, migration, or pool setup failures.
    pub async fn connect(pg: &PostgresConfig, config: StoreConfig) -> StoreResult<Self> {
        let connect_options = PgConnectOptions::from_str(&pg.url)?;
        let connect_timeout = Duration::from_millis(pg.connect_timeout_ms);
        let pool = tokio::time::timeout(
            connect_timeout,
            PgPoolOptions::new()
                .max_connections(pg.max_connections)
                .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
                .connect_with(connect_options),
        )
        .await
        .map_err(|_| anyhow!("postgres connect timed out after {connect_timeout:?}"))??;

        sqlx::migrate!("./migrations").run(&pool).await?;

        if let Some(retention) = config.change_retention_max_rows {
            spawn_retention_task(pool.clone(), retention);
        }

        Ok(Self { pool, config })
    }

    fn limit(&self) -> i64 {
        self.config.changes_limit as i64
    }
}

/// Keep only the newest `max_rows` change records. Best-effort; errors retry next tick.
fn spawn_retention_task(pool: PgPool, max_rows: i64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RETENTION_TICK);
        loop {
            ticker.tick().await;
            let result = sqlx::query(
                "DELETE FROM change_records WHERE seq < (SELECT COALESCE(MAX(seq) - $1 + 1, 0) FROM change_records)",
            )
            .bind(max_rows)
            .execute(&pool)
            .await;
            if let Err(err) = result {
                tracing::debug!(error = %err, "change record retention pass failed");
            }
        }
    });
}

#[async_trait]
impl GrantStore for PostgresStore {
    // -----------------------------
    // Roles
    // -----------------------------

    async fn get_role(&self, role_key: &str) -> StoreResult<Option<Role>> {
        let row = sqlx::query_as::<_, DbRole>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE key = $1"
        ))
        .bind(role_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(role_from_db))
    }

    async fn get_roles(&self, role_keys: &[String]) -> StoreResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, DbRole>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE key = ANY($1) ORDER BY key"
        ))
        .bind(role_keys.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(role_from_db).collect())
    }

    async fn list_roles(&self, page: PageRequest) -> StoreResult<Page<Role>> {
        let page = page.normalized();
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM roles")
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query_as::<_, DbRole>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles ORDER BY key LIMIT $1 OFFSET $2"
        ))
        .bind(page.page_size as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(Page {
            items: rows.into_iter().map(role_from_db).collect(),
            total: total as u64,
            page: page.page,
            page_size: page.page_size,
        })
    }

    async fn create_role(&self, role: Role) -> StoreResult<Role> {
        let insert = sqlx::query(
            "INSERT INTO roles (key, name, description, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&role.key)
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("role exists".into()));
            }
            return Err(StoreError::Unexpected(err.into()));
        }
        Ok(role)
    }

    async fn update_role(&self, role: Role) -> StoreResult<Role> {
        let result = sqlx::query(
            "UPDATE roles SET name = $2, description = $3, updated_at = $4 WHERE key = $1",
        )
        .bind(&role.key)
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("role".into()));
        }
        Ok(role)
    }

    async fn delete_role(&self, role_key: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM roles WHERE key = $1")
            .bind(role_key)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("role".into()));
        }
        Ok(())
    }

    // -----------------------------
    // Permissions
    // -----------------------------

    async fn get_permission(&self, permission_key: &str) -> StoreResult<Option<Permission>> {
        let row = sqlx::query_as::<_, DbPermission>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE key = $1"
        ))
        .bind(permission_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(permission_from_db))
    }

    async fn get_permissions(
        &self,
        permission_keys: &[String],
        kind: Option<&str>,
    ) -> StoreResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, DbPermission>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions \
             WHERE key = ANY($1) AND ($2::text IS NULL OR kind = $2) ORDER BY key"
        ))
        .bind(permission_keys.to_vec())
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(permission_from_db).collect())
    }

    async fn list_permissions(
        &self,
        page: PageRequest,
        kind: Option<&str>,
    ) -> StoreResult<Page<Permission>> {
        let page = page.normalized();
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM permissions WHERE ($1::text IS NULL OR kind = $1)",
        )
        .bind(kind)
        .fetch_one(&self.pool)
        .await?;
        let rows = sqlx::query_as::<_, DbPermission>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions \
             WHERE ($1::text IS NULL OR kind = $1) ORDER BY key LIMIT $2 OFFSET $3"
        ))
        .bind(kind)
        .bind(page.page_size as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(Page {
            items: rows.into_iter().map(permission_from_db).collect(),
            total: total as u64,
            page: page.page,
            page_size: page.page_size,
        })
    }

    async fn create_permission(&self, permission: Permission) -> StoreResult<Permission> {
        let insert = sqlx::query(
            "INSERT INTO permissions (key, name, kind, description, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&permission.key)
        .bind(&permission.name)
        .bind(&permission.kind)
        .bind(&permission.description)
        .bind(permission.created_at)
        .bind(permission.updated_at)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("permission exists".into()));
            }
            return Err(StoreError::Unexpected(err.into()));
        }
        Ok(permission)
    }

    async fn update_permission(&self, permission: Permission) -> StoreResult<Permission> {
        let result = sqlx::query(
            "UPDATE permissions SET name = $2, kind = $3, description = $4, updated_at = $5 WHERE key = $1",
        )
        .bind(&permission.key)
        .bind(&permission.name)
        .bind(&permission.kind)
        .bind(&permission.description)
        .bind(permission.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("permission".into()));
        }
        Ok(permission)
    }

    async fn delete_permission(&self, permission_key: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM permissions WHERE key = $1")
            .bind(permission_key)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("permission".into()));
        }
        Ok(())
    }

    // -----------------------------
    // Role grants
    // -----------------------------

    async fn role_permission_keys(&self, role_keys: &[String]) -> StoreResult<BTreeSet<String>> {
        let keys = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT permission_key FROM role_permissions WHERE role_key = ANY($1)",
        )
        .bind(role_keys.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(keys.into_iter().collect())
    }

    async fn roles_granting_permission(&self, permission_key: &str) -> StoreResult<Vec<String>> {
        Ok(sqlx::query_scalar::<_, String>(
            "SELECT role_key FROM role_permissions WHERE permission_key = $1 ORDER BY role_key",
        )
        .bind(permission_key)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn add_role_permissions(
        &self,
        role_key: &str,
        permission_keys: &[String],
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO role_permissions (role_key, permission_key) \
             SELECT $1, UNNEST($2::text[]) ON CONFLICT DO NOTHING",
        )
        .bind(role_key)
        .bind(permission_keys.to_vec())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_role_permissions(
        &self,
        role_key: &str,
        permission_keys: &[String],
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            "DELETE FROM role_permissions WHERE role_key = $1 AND permission_key = ANY($2)",
        )
        .bind(role_key)
        .bind(permission_keys.to_vec())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn clear_role_permissions(&self, role_key: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM role_permissions WHERE role_key = $1")
            .bind(role_key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_permission_grants(&self, permission_key: &str) -> StoreResult<Vec<String>> {
        let roles = sqlx::query_scalar::<_, String>(
            "DELETE FROM role_permissions WHERE permission_key = $1 RETURNING role_key",
        )
        .bind(permission_key)
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    // -----------------------------
    // Principal assignments
    // -----------------------------

    async fn principal_role_keys(&self, principal_id: &str) -> StoreResult<BTreeSet<String>> {
        let keys = sqlx::query_scalar::<_, String>(
            "SELECT role_key FROM principal_roles WHERE principal_id = $1",
        )
        .bind(principal_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(keys.into_iter().collect())
    }

    async fn principals_with_role(&self, role_key: &str) -> StoreResult<Vec<String>> {
        Ok(sqlx::query_scalar::<_, String>(
            "SELECT principal_id FROM principal_roles WHERE role_key = $1 ORDER BY principal_id",
        )
        .bind(role_key)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn add_principal_roles(
        &self,
        principal_id: &str,
        role_keys: &[String],
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO principal_roles (principal_id, role_key) \
             SELECT $1, UNNEST($2::text[]) ON CONFLICT DO NOTHING",
        )
        .bind(principal_id)
        .bind(role_keys.to_vec())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_principal_roles(
        &self,
        principal_id: &str,
        role_keys: &[String],
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            "DELETE FROM principal_roles WHERE principal_id = $1 AND role_key = ANY($2)",
        )
        .bind(principal_id)
        .bind(role_keys.to_vec())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn clear_role_assignments(&self, role_key: &str) -> StoreResult<Vec<String>> {
        let principals = sqlx::query_scalar::<_, String>(
            "DELETE FROM principal_roles WHERE role_key = $1 RETURNING principal_id",
        )
        .bind(role_key)
        .fetch_all(&self.pool)
        .await?;
        Ok(principals)
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[async_trait]
impl MenuStore for PostgresStore {
    async fn list_menu_nodes(&self) -> StoreResult<Vec<MenuNode>> {
        let rows = sqlx::query_as::<_, DbMenuNode>(&format!(
            "SELECT {MENU_COLUMNS} FROM menu_nodes ORDER BY sort_order, path"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(menu_node_from_db).collect())
    }

    async fn get_menu_node(&self, id: &str) -> StoreResult<Option<MenuNode>> {
        let row = sqlx::query_as::<_, DbMenuNode>(&format!(
            "SELECT {MENU_COLUMNS} FROM menu_nodes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(menu_node_from_db))
    }

    async fn create_menu_node(&self, node: MenuNode) -> StoreResult<MenuNode> {
        let insert = sqlx::query(&format!(
            "INSERT INTO menu_nodes ({MENU_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(&node.id)
        .bind(&node.name)
        .bind(&node.path)
        .bind(&node.icon)
        .bind(&node.permission_key)
        .bind(&node.parent_id)
        .bind(node.order)
        .bind(node.enabled)
        .bind(&node.meta)
        .bind(node.created_at)
        .bind(node.updated_at)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("menu path exists".into()));
            }
            return Err(StoreError::Unexpected(err.into()));
        }
        Ok(node)
    }

    async fn update_menu_node(&self, node: MenuNode) -> StoreResult<MenuNode> {
        let result = sqlx::query(
            "UPDATE menu_nodes SET name = $2, path = $3, icon = $4, permission_key = $5, \
             parent_id = $6, sort_order = $7, enabled = $8, meta = $9, updated_at = $10 WHERE id = $1",
        )
        .bind(&node.id)
        .bind(&node.name)
        .bind(&node.path)
        .bind(&node.icon)
        .bind(&node.permission_key)
        .bind(&node.parent_id)
        .bind(node.order)
        .bind(node.enabled)
        .bind(&node.meta)
        .bind(node.updated_at)
        .execute(&self.pool)
        .await;
        match result {
            Ok(done) if done.rows_affected() == 0 => Err(StoreError::NotFound("menu node".into())),
            Ok(_) => Ok(node),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::Conflict("menu path exists".into()))
            }
            Err(err) => Err(StoreError::Unexpected(err.into())),
        }
    }

    async fn delete_menu_node(&self, id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM menu_nodes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("menu node".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChangeStore for PostgresStore {
    async fn append_change(&self, record: ChangeRecord) -> StoreResult<u64> {
        let seq = sqlx::query_scalar::<_, i64>(
            "INSERT INTO change_records \
             (actor_id, actor_type, action, target_type, target_key, before, after, status, details, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING seq",
        )
        .bind(&record.actor_id)
        .bind(record.actor_type.as_str())
        .bind(record.action.as_str())
        .bind(record.target_type.as_str())
        .bind(&record.target_key)
        .bind(&record.before)
        .bind(&record.after)
        .bind(record.status.as_str())
        .bind(&record.details)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(seq as u64)
    }

    async fn list_changes(&self, query: &ChangeQuery) -> StoreResult<ChangeSet<ChangeRecord>> {
        let limit = match query.limit {
            0 => self.limit(),
            requested => (requested as i64).min(self.limit()),
        };
        let rows = sqlx::query_as::<_, ChangeRecordRow>(
            "SELECT seq, actor_id, actor_type, action, target_type, target_key, before, after, \
             status, details, created_at FROM change_records \
             WHERE seq >= $1 \
               AND ($2::text IS NULL OR target_type = $2) \
               AND ($3::text IS NULL OR target_key = $3) \
               AND ($4::text IS NULL OR action = $4) \
             ORDER BY seq ASC LIMIT $5",
        )
        .bind(query.since as i64)
        .bind(query.target_type.map(|t| t.as_str()))
        .bind(query.target_key.as_deref())
        .bind(query.action.map(|a| a.as_str()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let full_page = rows.len() as i64 == limit;
        let items = rows
            .into_iter()
            .map(change_from_db)
            .collect::<StoreResult<Vec<_>>>()?;
        let next_seq = match items.last() {
            Some(last) if full_page => last.seq + 1,
            _ => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COALESCE(MAX(seq) + 1, 0) FROM change_records",
                )
                .fetch_one(&self.pool)
                .await? as u64
            }
        };
        Ok(ChangeSet { items, next_seq })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}

fn role_from_db(row: DbRole) -> Role {
    Role {
        key: row.key,
        name: row.name,
        description: row.description,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn permission_from_db(row: DbPermission) -> Permission {
    Permission {
        key: row.key,
        name: row.name,
        kind: row.kind,
        description: row.description,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn menu_node_from_db(row: DbMenuNode) -> MenuNode {
    MenuNode {
        id: row.id,
        name: row.name,
        path: row.path,
        icon: row.icon,
        permission_key: row.permission_key,
        parent_id: row.parent_id,
        order: row.sort_order,
        enabled: row.enabled,
        meta: row.meta,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn change_from_db(row: ChangeRecordRow) -> StoreResult<ChangeRecord> {
    Ok(ChangeRecord {
        seq: row.seq as u64,
        actor_id: row.actor_id,
        actor_type: row.actor_type.parse().map_err(|err: String| anyhow!(err))?,
        action: row.action.parse().map_err(|err: String| anyhow!(err))?,
        target_type: row.target_type.parse().map_err(|err: String| anyhow!(err))?,
        target_key: row.target_key,
        before: row.before,
        after: row.after,
        status: row.status.parse().map_err(|err: String| anyhow!(err))?,
        details: row.details,
        created_at: row.created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActorType, ChangeAction, ChangeStatus, TargetType};

    #[test]
    fn unique_violation_detects_only_db_codes() {
        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }

    fn change_row(action: &str) -> ChangeRecordRow {
        ChangeRecordRow {
            seq: 7,
            actor_id: "admin".to_string(),
            actor_type: "SERVICE".to_string(),
            action: action.to_string(),
            target_type: "MENU".to_string(),
            target_key: "n1".to_string(),
            before: None,
            after: Some(serde_json::json!({"path": "/reports"})),
            status: "SUCCESS".to_string(),
            details: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn change_from_db_maps_enum_columns() {
        let record = change_from_db(change_row("UPDATE_MENU_PERMISSION")).expect("record");
        assert_eq!(record.seq, 7);
        assert_eq!(record.actor_type, ActorType::Service);
        assert_eq!(record.action, ChangeAction::UpdateMenuPermission);
        assert_eq!(record.target_type, TargetType::Menu);
        assert_eq!(record.status, ChangeStatus::Success);
    }

    #[test]
    fn change_from_db_rejects_unknown_action() {
        let err = change_from_db(change_row("RENAME_MENU")).expect_err("unknown action");
        assert!(err.to_string().contains("RENAME_MENU"));
    }

    #[test]
    fn menu_node_from_db_maps_sort_order() {
        let now = Utc::now();
        let node = menu_node_from_db(DbMenuNode {
            id: "n1".to_string(),
            name: "Reports".to_string(),
            path: "/reports".to_string(),
            icon: "chart".to_string(),
            permission_key: Some("report:view".to_string()),
            parent_id: None,
            sort_order: 3,
            enabled: true,
            meta: Value::Null,
            created_at: now,
            updated_at: now,
        });
        assert_eq!(node.order, 3);
        assert_eq!(node.permission_key.as_deref(), Some("report:view"));
    }
}
