//! Role and permission administration.
//!
//! # Purpose
//! Validates and applies role/permission CRUD, emits change records, and
//! keeps the permission cache coherent when a delete removes grants.
//!
//! # Key invariants
//! - Key formats are checked before any store access.
//! - Deletes remove edges before the node: role deletion clears assignments,
//!   then grants, then the role; permission deletion clears grants, then the
//!   permission. A crash mid-sequence leaves missing edges, never edges that
//!   point at a missing node.
//! - Holders are enumerated before their edges are removed, and the edges
//!   the store reports as removed are added to the fan-out, so principals
//!   assigned or granted in between are invalidated too.
use super::error::{AuthzError, AuthzResult};
use super::keys::{validate_permission_key, validate_role_key};
use super::resolver::AuthorizationResolver;
use crate::audit::ChangeSink;
use crate::model::{
    Actor, ChangeAction, ChangeRecord, NewPermission, NewRole, Permission, PermissionPatch, Role,
    RolePatch, TargetType,
};
use crate::store::{GrantStore, Page, PageRequest, StoreError, StoreResult};
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn GrantStore>,
    resolver: AuthorizationResolver,
    sink: Arc<dyn ChangeSink>,
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn GrantStore>,
        resolver: AuthorizationResolver,
        sink: Arc<dyn ChangeSink>,
    ) -> Self {
        Self {
            store,
            resolver,
            sink,
        }
    }

    /// Records a store failure for a write that passed validation.
    fn failed<T>(
        &self,
        actor: &Actor,
        action: ChangeAction,
        target_type: TargetType,
        target_key: &str,
        err: StoreError,
    ) -> AuthzResult<T> {
        let err = AuthzError::from(err);
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
    // Roles
    // -----------------------------

    pub async fn create_role(&self, actor: &Actor, new: NewRole) -> AuthzResult<Role> {
        validate_role_key(&new.key)?;
        require_name(&new.name)?;
        let now = Utc::now();
        let role_key = new.key.clone();
        let role = match self
            .store
            .create_role(Role {
                key: new.key,
                name: new.name,
                description: new.description,
                created_at: now,
                updated_at: now,
            })
            .await
        {
            Ok(role) => role,
            Err(err) => {
                return self.failed(
                    actor,
                    ChangeAction::CreateRole,
                    TargetType::Role,
                    &role_key,
                    err,
                );
            }
        };
        metrics::counter!("warden_grant_mutations_total", "op" => "role_created").increment(1);
        tracing::info!(role_key = %role.key, actor_id = %actor.id, "role created");
        self.sink.record(
            ChangeRecord::success(actor, ChangeAction::CreateRole, TargetType::Role, &role.key)
                .with_after(&role),
        );
        Ok(role)
    }

    pub async fn get_role(&self, role_key: &str) -> AuthzResult<Role> {
        validate_role_key(role_key)?;
        self.store
            .get_role(role_key)
            .await?
            .ok_or_else(|| AuthzError::NotFound(format!("role {role_key}")))
    }

    pub async fn list_roles(&self, page: PageRequest) -> AuthzResult<Page<Role>> {
        Ok(self.store.list_roles(page).await?)
    }

    /// Overwrites only the non-empty fields of `patch`.
    pub async fn update_role(
        &self,
        actor: &Actor,
        role_key: &str,
        patch: RolePatch,
    ) -> AuthzResult<Role> {
        let before = self.get_role(role_key).await?;
        let mut role = before.clone();
        patch.apply(&mut role);
        role.updated_at = Utc::now();
        let role = match self.store.update_role(role).await {
            Ok(role) => role,
            Err(err) => {
                return self.failed(
                    actor,
                    ChangeAction::UpdateRole,
                    TargetType::Role,
                    role_key,
                    err,
                );
            }
        };
        self.sink.record(
            ChangeRecord::success(actor, ChangeAction::UpdateRole, TargetType::Role, role_key)
                .with_before(&before)
                .with_after(&role),
        );
        Ok(role)
    }

    pub async fn delete_role(&self, actor: &Actor, role_key: &str) -> AuthzResult<()> {
        let before = self.get_role(role_key).await?;
        let mut holders: BTreeSet<String> = self
            .store
            .principals_with_role(role_key)
            .await?
            .into_iter()
            .collect();

        let result: StoreResult<()> = async {
            // Assignments made after the enumeration above are only known here.
            holders.extend(self.store.clear_role_assignments(role_key).await?);
            self.store.clear_role_permissions(role_key).await?;
            self.store.delete_role(role_key).await
        }
        .await;
        let holders: Vec<String> = holders.into_iter().collect();
        // Some edges may be gone even when a later step failed.
        self.resolver.invalidate_principals(&holders).await;
        if let Err(err) = result {
            return self.failed(
                actor,
                ChangeAction::DeleteRole,
                TargetType::Role,
                role_key,
                err,
            );
        }

        metrics::counter!("warden_grant_mutations_total", "op" => "role_deleted").increment(1);
        tracing::info!(role_key, holders = holders.len(), actor_id = %actor.id, "role deleted");
        self.sink.record(
            ChangeRecord::success(actor, ChangeAction::DeleteRole, TargetType::Role, role_key)
                .with_before(&before),
        );
        Ok(())
    }

    // -----------------------------
    // Permissions
    // -----------------------------

    pub async fn create_permission(
        &self,
        actor: &Actor,
        new: NewPermission,
    ) -> AuthzResult<Permission> {
        validate_permission_key(&new.key)?;
        require_name(&new.name)?;
        let now = Utc::now();
        let permission_key = new.key.clone();
        let permission = match self
            .store
            .create_permission(Permission {
                key: new.key,
                name: new.name,
                kind: new.kind,
                description: new.description,
                created_at: now,
                updated_at: now,
            })
            .await
        {
            Ok(permission) => permission,
            Err(err) => {
                return self.failed(
                    actor,
                    ChangeAction::CreatePermission,
                    TargetType::Permission,
                    &permission_key,
                    err,
                );
            }
        };
        metrics::counter!("warden_grant_mutations_total", "op" => "permission_created")
            .increment(1);
        self.sink.record(
            ChangeRecord::success(
                actor,
                ChangeAction::CreatePermission,
                TargetType::Permission,
                &permission.key,
            )
            .with_after(&permission),
        );
        Ok(permission)
    }

    pub async fn get_permission(&self, permission_key: &str) -> AuthzResult<Permission> {
        validate_permission_key(permission_key)?;
        self.store
            .get_permission(permission_key)
            .await?
            .ok_or_else(|| AuthzError::NotFound(format!("permission {permission_key}")))
    }

    pub async fn list_permissions(
        &self,
        page: PageRequest,
        kind: Option<&str>,
    ) -> AuthzResult<Page<Permission>> {
        let kind = kind.filter(|kind| !kind.is_empty());
        Ok(self.store.list_permissions(page, kind).await?)
    }

    pub async fn update_permission(
        &self,
        actor: &Actor,
        permission_key: &str,
        patch: PermissionPatch,
    ) -> AuthzResult<Permission> {
        let before = self.get_permission(permission_key).await?;
        let mut permission = before.clone();
        patch.apply(&mut permission);
        permission.updated_at = Utc::now();
        let permission = match self.store.update_permission(permission).await {
            Ok(permission) => permission,
            Err(err) => {
                return self.failed(
                    actor,
                    ChangeAction::UpdatePermission,
                    TargetType::Permission,
                    permission_key,
                    err,
                );
            }
        };
        self.sink.record(
            ChangeRecord::success(
                actor,
                ChangeAction::UpdatePermission,
                TargetType::Permission,
                permission_key,
            )
            .with_before(&before)
            .with_after(&permission),
        );
        Ok(permission)
    }

    pub async fn delete_permission(&self, actor: &Actor, permission_key: &str) -> AuthzResult<()> {
        let before = self.get_permission(permission_key).await?;
        let mut holders = BTreeSet::new();
        for role_key in self.store.roles_granting_permission(permission_key).await? {
            holders.extend(self.store.principals_with_role(&role_key).await?);
        }

        let result: StoreResult<()> = async {
            // Grants made after the enumeration above are only known here. The
            // assignment edges of those roles are still intact.
            for role_key in self.store.clear_permission_grants(permission_key).await? {
                holders.extend(self.store.principals_with_role(&role_key).await?);
            }
            self.store.delete_permission(permission_key).await
        }
        .await;
        if result.is_err() {
            // The removed grants may not have been fanned out to their holders.
            self.resolver.invalidate_all().await;
        } else {
            let holders: Vec<String> = holders.into_iter().collect();
            self.resolver.invalidate_principals(&holders).await;
        }
        if let Err(err) = result {
            return self.failed(
                actor,
                ChangeAction::DeletePermission,
                TargetType::Permission,
                permission_key,
                err,
            );
        }

        metrics::counter!("warden_grant_mutations_total", "op" => "permission_deleted")
            .increment(1);
        self.sink.record(
            ChangeRecord::success(
                actor,
                ChangeAction::DeletePermission,
                TargetType::Permission,
                permission_key,
            )
            .with_before(&before),
        );
        Ok(())
    }
}

fn require_name(name: &str) -> AuthzResult<()> {
    if name.trim().is_empty() {
        return Err(AuthzError::Validation("name is required".into()));
    }
    Ok(())
}
