//! Grant assignment: role↔permission and principal↔role edges.
//!
//! # Purpose
//! Applies batch assignments as set differences against the edges already
//! held, then invalidates every cached result the change can affect.
//!
//! # Key invariants
//! - One invalid target fails the whole batch before anything is written.
//! - Assigning a held edge and unassigning a missing edge are no-ops.
//! - Principal existence is confirmed with the principal directory; an
//!   unreachable directory fails the assignment.
use super::error::{AuthzError, AuthzResult};
use super::keys::{
    normalize_keys, validate_permission_key, validate_principal_id, validate_role_key,
};
use super::resolver::AuthorizationResolver;
use crate::audit::ChangeSink;
use crate::model::{Actor, ChangeAction, ChangeRecord, Permission, Role, TargetType};
use crate::principal::PrincipalDirectory;
use crate::store::GrantStore;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Largest principal list one roles lookup may carry.
pub const MAX_BATCH_PRINCIPALS: usize = crate::store::MAX_PAGE_SIZE as usize;

#[derive(Clone)]
pub struct GrantService {
    store: Arc<dyn GrantStore>,
    resolver: AuthorizationResolver,
    directory: Arc<dyn PrincipalDirectory>,
    sink: Arc<dyn ChangeSink>,
}

impl GrantService {
    pub fn new(
        store: Arc<dyn GrantStore>,
        resolver: AuthorizationResolver,
        directory: Arc<dyn PrincipalDirectory>,
        sink: Arc<dyn ChangeSink>,
    ) -> Self {
        Self {
            store,
            resolver,
            directory,
            sink,
        }
    }

    async fn require_role(&self, role_key: &str) -> AuthzResult<Role> {
        self.store
            .get_role(role_key)
            .await?
            .ok_or_else(|| AuthzError::NotFound(format!("role {role_key}")))
    }

    async fn require_permissions(&self, keys: &[String]) -> AuthzResult<()> {
        let found = self.store.get_permissions(keys, None).await?;
        if let Some(missing) = keys
            .iter()
            .find(|key| !found.iter().any(|permission| &permission.key == *key))
        {
            return Err(AuthzError::NotFound(format!("permission {missing}")));
        }
        Ok(())
    }

    async fn require_roles(&self, keys: &[String]) -> AuthzResult<()> {
        let found = self.store.get_roles(keys).await?;
        if let Some(missing) = keys
            .iter()
            .find(|key| !found.iter().any(|role| &role.key == *key))
        {
            return Err(AuthzError::NotFound(format!("role {missing}")));
        }
        Ok(())
    }

    async fn require_active_principal(&self, principal_id: &str) -> AuthzResult<()> {
        let active = self
            .directory
            .is_principal_active(principal_id)
            .await
            .inspect_err(|err| {
                tracing::warn!(principal_id, error = %err, "principal directory unavailable");
            })?;
        if !active {
            return Err(AuthzError::NotFound(format!("principal {principal_id}")));
        }
        Ok(())
    }

    /// Records a failed write that passed validation, then returns the error.
    fn failed<T>(
        &self,
        actor: &Actor,
        action: ChangeAction,
        target_type: TargetType,
        target_key: &str,
        err: AuthzError,
    ) -> AuthzResult<T> {
        self.sink.record(ChangeRecord::failure(
            actor,
            action,
            target_type,
            target_key,
            err.to_string(),
        ));
        Err(err)
    }

    // -----------------------------
    // Role ↔ permission
    // -----------------------------

    pub async fn assign_permissions_to_role(
        &self,
        actor: &Actor,
        role_key: &str,
        permission_keys: &[String],
    ) -> AuthzResult<Vec<String>> {
        validate_role_key(role_key)?;
        let keys = normalize_keys(permission_keys, "permission key", validate_permission_key)?;
        self.require_role(role_key).await?;
        self.require_permissions(&keys).await?;

        let held = self.store.role_permission_keys(&[role_key.to_string()]).await?;
        let added: Vec<String> = keys.into_iter().filter(|key| !held.contains(key)).collect();
        if added.is_empty() {
            return Ok(added);
        }
        if let Err(err) = self.store.add_role_permissions(role_key, &added).await {
            let err = AuthzError::from(err);
            return self.failed(
                actor,
                ChangeAction::AssignRolePermission,
                TargetType::RolePermission,
                role_key,
                err,
            );
        }
        self.resolver.invalidate_role_holders(role_key).await;

        metrics::counter!("warden_grant_mutations_total", "op" => "permissions_assigned")
            .increment(1);
        self.sink.record(
            ChangeRecord::success(
                actor,
                ChangeAction::AssignRolePermission,
                TargetType::RolePermission,
                role_key,
            )
            .with_after(&added),
        );
        Ok(added)
    }

    pub async fn unassign_permissions_from_role(
        &self,
        actor: &Actor,
        role_key: &str,
        permission_keys: &[String],
    ) -> AuthzResult<u64> {
        validate_role_key(role_key)?;
        let keys = normalize_keys(permission_keys, "permission key", validate_permission_key)?;
        self.require_role(role_key).await?;

        let removed = match self.store.remove_role_permissions(role_key, &keys).await {
            Ok(removed) => removed,
            Err(err) => {
                // A partial delete may have happened; drop what could be stale.
                self.resolver.invalidate_role_holders(role_key).await;
                let err = AuthzError::from(err);
                return self.failed(
                    actor,
                    ChangeAction::UnassignRolePermission,
                    TargetType::RolePermission,
                    role_key,
                    err,
                );
            }
        };
        if removed == 0 {
            return Ok(0);
        }
        self.resolver.invalidate_role_holders(role_key).await;

        metrics::counter!("warden_grant_mutations_total", "op" => "permissions_unassigned")
            .increment(1);
        self.sink.record(
            ChangeRecord::success(
                actor,
                ChangeAction::UnassignRolePermission,
                TargetType::RolePermission,
                role_key,
            )
            .with_before(&keys),
        );
        Ok(removed)
    }

    pub async fn role_permissions(&self, role_key: &str) -> AuthzResult<Vec<Permission>> {
        validate_role_key(role_key)?;
        self.require_role(role_key).await?;
        let keys: Vec<String> = self
            .store
            .role_permission_keys(&[role_key.to_string()])
            .await?
            .into_iter()
            .collect();
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.store.get_permissions(&keys, None).await?)
    }

    // -----------------------------
    // Principal ↔ role
    // -----------------------------

    pub async fn assign_roles_to_user(
        &self,
        actor: &Actor,
        principal_id: &str,
        role_keys: &[String],
    ) -> AuthzResult<Vec<String>> {
        validate_principal_id(principal_id)?;
        let keys = normalize_keys(role_keys, "role key", validate_role_key)?;
        self.require_active_principal(principal_id).await?;
        self.require_roles(&keys).await?;

        let held = self.store.principal_role_keys(principal_id).await?;
        let added: Vec<String> = keys.into_iter().filter(|key| !held.contains(key)).collect();
        if added.is_empty() {
            return Ok(added);
        }
        if let Err(err) = self.store.add_principal_roles(principal_id, &added).await {
            self.resolver.invalidate_principal(principal_id).await;
            let err = AuthzError::from(err);
            return self.failed(
                actor,
                ChangeAction::AssignUserRole,
                TargetType::UserRole,
                principal_id,
                err,
            );
        }
        self.resolver.invalidate_principal(principal_id).await;

        metrics::counter!("warden_grant_mutations_total", "op" => "roles_assigned").increment(1);
        tracing::info!(principal_id, roles = ?added, actor_id = %actor.id, "roles assigned");
        self.sink.record(
            ChangeRecord::success(
                actor,
                ChangeAction::AssignUserRole,
                TargetType::UserRole,
                principal_id,
            )
            .with_after(&added),
        );
        Ok(added)
    }

    pub async fn unassign_roles_from_user(
        &self,
        actor: &Actor,
        principal_id: &str,
        role_keys: &[String],
    ) -> AuthzResult<u64> {
        validate_principal_id(principal_id)?;
        let keys = normalize_keys(role_keys, "role key", validate_role_key)?;

        let result = self.store.remove_principal_roles(principal_id, &keys).await;
        self.resolver.invalidate_principal(principal_id).await;
        let removed = match result {
            Ok(removed) => removed,
            Err(err) => {
                let err = AuthzError::from(err);
                return self.failed(
                    actor,
                    ChangeAction::UnassignUserRole,
                    TargetType::UserRole,
                    principal_id,
                    err,
                );
            }
        };
        if removed == 0 {
            return Ok(0);
        }

        metrics::counter!("warden_grant_mutations_total", "op" => "roles_unassigned").increment(1);
        tracing::info!(principal_id, roles = ?keys, actor_id = %actor.id, "roles unassigned");
        self.sink.record(
            ChangeRecord::success(
                actor,
                ChangeAction::UnassignUserRole,
                TargetType::UserRole,
                principal_id,
            )
            .with_before(&keys),
        );
        Ok(removed)
    }

    /// Roles assigned to a principal. Assignments to deleted roles are skipped.
    pub async fn user_roles(&self, principal_id: &str) -> AuthzResult<Vec<Role>> {
        validate_principal_id(principal_id)?;
        let keys: Vec<String> = self
            .store
            .principal_role_keys(principal_id)
            .await?
            .into_iter()
            .collect();
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.store.get_roles(&keys).await?)
    }

    pub async fn batch_user_roles(
        &self,
        principal_ids: &[String],
    ) -> AuthzResult<BTreeMap<String, Vec<Role>>> {
        if principal_ids.len() > MAX_BATCH_PRINCIPALS {
            return Err(AuthzError::Validation(format!(
                "at most {MAX_BATCH_PRINCIPALS} principal ids per batch"
            )));
        }
        let mut out = BTreeMap::new();
        for principal_id in principal_ids {
            if out.contains_key(principal_id) {
                continue;
            }
            let roles = self.user_roles(principal_id).await?;
            out.insert(principal_id.clone(), roles);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::TracingChangeSink;
    use crate::model::NewRole;
    use crate::principal::StaticPrincipalDirectory;
    use crate::store::StoreConfig;
    use crate::store::memory::InMemoryStore;
    use chrono::Utc;
    use std::time::Duration;

    struct Fixture {
        grants: GrantService,
        store: Arc<InMemoryStore>,
        resolver: AuthorizationResolver,
        actor: Actor,
    }

    async fn fixture(directory: StaticPrincipalDirectory) -> Fixture {
        let store = Arc::new(InMemoryStore::new(StoreConfig {
            changes_limit: 10,
            change_retention_max_rows: None,
        }));
        let resolver = AuthorizationResolver::new(store.clone(), Duration::from_secs(60));
        let sink = Arc::new(TracingChangeSink);
        let catalog =
            crate::authz::CatalogService::new(store.clone(), resolver.clone(), sink.clone());
        let actor = Actor::user("admin");
        for key in ["analyst", "auditor"] {
            catalog
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
        let now = Utc::now();
        for key in ["report:view", "report:export"] {
            store
                .create_permission(Permission {
                    key: key.to_string(),
                    name: key.to_string(),
                    kind: "api".to_string(),
                    description: String::new(),
                    created_at: now,
                    updated_at: now,
                })
                .await
                .expect("permission");
        }
        let grants = GrantService::new(store.clone(), resolver.clone(), Arc::new(directory), sink);
        Fixture {
            grants,
            store,
            resolver,
            actor,
        }
    }

    fn keys(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[tokio::test]
    async fn assigning_twice_yields_the_same_edges() {
        let f = fixture(StaticPrincipalDirectory::allow_all()).await;
        let added = f
            .grants
            .assign_roles_to_user(&f.actor, "u1", &keys(&["analyst"]))
            .await
            .expect("assign");
        assert_eq!(added, keys(&["analyst"]));
        let added = f
            .grants
            .assign_roles_to_user(&f.actor, "u1", &keys(&["analyst"]))
            .await
            .expect("assign again");
        assert!(added.is_empty());
        assert_eq!(
            f.store.principal_role_keys("u1").await.expect("roles").len(),
            1
        );
    }

    #[tokio::test]
    async fn one_unknown_target_fails_the_whole_batch() {
        let f = fixture(StaticPrincipalDirectory::allow_all()).await;
        let err = f
            .grants
            .assign_permissions_to_role(
                &f.actor,
                "analyst",
                &keys(&["report:view", "report:delete"]),
            )
            .await
            .expect_err("unknown permission");
        assert!(matches!(err, AuthzError::NotFound(_)));
        assert!(f
            .store
            .role_permission_keys(&keys(&["analyst"]))
            .await
            .expect("grants")
            .is_empty());
    }

    #[tokio::test]
    async fn inactive_principal_is_not_found() {
        let f = fixture(StaticPrincipalDirectory::only(["u1"])).await;
        let err = f
            .grants
            .assign_roles_to_user(&f.actor, "u2", &keys(&["analyst"]))
            .await
            .expect_err("inactive");
        assert!(matches!(err, AuthzError::NotFound(_)));
    }

    #[tokio::test]
    async fn revoking_a_grant_reaches_every_holder() {
        let f = fixture(StaticPrincipalDirectory::allow_all()).await;
        f.grants
            .assign_permissions_to_role(&f.actor, "analyst", &keys(&["report:view"]))
            .await
            .expect("grant");
        for principal in ["u1", "u2"] {
            f.grants
                .assign_roles_to_user(&f.actor, principal, &keys(&["analyst"]))
                .await
                .expect("assign");
            assert!(f.resolver.check_permission(principal, "report:view").await.expect("check"));
        }

        let removed = f
            .grants
            .unassign_permissions_from_role(&f.actor, "analyst", &keys(&["report:view"]))
            .await
            .expect("revoke");
        assert_eq!(removed, 1);
        for principal in ["u1", "u2"] {
            assert!(!f.resolver.check_permission(principal, "report:view").await.expect("check"));
        }
    }

    #[tokio::test]
    async fn unassigning_a_missing_edge_is_a_noop() {
        let f = fixture(StaticPrincipalDirectory::allow_all()).await;
        let removed = f
            .grants
            .unassign_roles_from_user(&f.actor, "u1", &keys(&["auditor"]))
            .await
            .expect("noop");
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn user_roles_skip_deleted_roles() {
        let f = fixture(StaticPrincipalDirectory::allow_all()).await;
        f.grants
            .assign_roles_to_user(&f.actor, "u1", &keys(&["analyst", "auditor"]))
            .await
            .expect("assign");
        // Simulate an orphaned assignment left behind by an interrupted delete.
        f.store.delete_role("auditor").await.expect("delete");

        let roles = f.grants.user_roles("u1").await.expect("roles");
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].key, "analyst");

        let batch = f
            .grants
            .batch_user_roles(&keys(&["u1", "u9", "u1"]))
            .await
            .expect("batch");
        assert_eq!(batch.len(), 2);
        assert!(batch["u9"].is_empty());

        let oversized: Vec<String> = (0..=MAX_BATCH_PRINCIPALS).map(|i| format!("u{i}")).collect();
        let err = f
            .grants
            .batch_user_roles(&oversized)
            .await
            .expect_err("too many ids");
        assert!(matches!(err, AuthzError::Validation(_)));
    }
}
