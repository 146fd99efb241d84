//! OpenAPI document for the warden HTTP API.
use crate::api::types::{
    AssignedResponse, BatchUserRolesRequest, BatchUserRolesResponse, ChangeListResponse,
    CheckRequest, CheckResponse, ErrorResponse, HealthStatus, MenuGuardRequest, MenuTreeResponse,
    PermissionKeysRequest, PermissionListResponse, PermissionsResponse, RoleKeysRequest,
    RoleListResponse, RolesResponse, UnassignedResponse,
};
use crate::api::{changes, check, menus, permissions, roles, system, users};
use crate::model::{
    ActorType, ChangeAction, ChangeRecord, ChangeStatus, MenuNode, MenuNodePatch, MenuTreeNode,
    NewMenuNode, NewPermission, NewRole, Permission, PermissionPatch, Role, RolePatch, TargetType,
};
use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "warden",
        version = "v1",
        description = "Role-based access control and menu visibility API"
    ),
    paths(
        system::system_health,
        check::check_permission,
        check::user_permissions,
        roles::list_roles,
        roles::create_role,
        roles::get_role,
        roles::update_role,
        roles::delete_role,
        roles::role_permissions,
        roles::assign_role_permissions,
        roles::unassign_role_permissions,
        permissions::list_permissions,
        permissions::create_permission,
        permissions::get_permission,
        permissions::update_permission,
        permissions::delete_permission,
        users::user_roles,
        users::assign_user_roles,
        users::unassign_user_roles,
        users::batch_user_roles,
        users::user_menu,
        menus::menu_tree,
        menus::create_menu_node,
        menus::get_menu_node,
        menus::update_menu_node,
        menus::update_menu_guard,
        menus::delete_menu_node,
        changes::list_changes,
    ),
    components(schemas(
        ErrorResponse,
        HealthStatus,
        CheckRequest,
        CheckResponse,
        PermissionKeysRequest,
        RoleKeysRequest,
        AssignedResponse,
        UnassignedResponse,
        BatchUserRolesRequest,
        BatchUserRolesResponse,
        RoleListResponse,
        PermissionListResponse,
        PermissionsResponse,
        RolesResponse,
        MenuTreeResponse,
        MenuGuardRequest,
        ChangeListResponse,
        Role,
        NewRole,
        RolePatch,
        Permission,
        NewPermission,
        PermissionPatch,
        MenuNode,
        MenuTreeNode,
        NewMenuNode,
        MenuNodePatch,
        ChangeRecord,
        ChangeAction,
        ChangeStatus,
        TargetType,
        ActorType,
    )),
    tags(
        (name = "authorization", description = "Permission checks"),
        (name = "roles", description = "Roles and role grants"),
        (name = "permissions", description = "Permission catalog"),
        (name = "users", description = "Principal assignments and menus"),
        (name = "menus", description = "Menu tree administration"),
        (name = "changes", description = "Change history"),
        (name = "system", description = "Service health")
    )
)]
pub struct ApiDoc;

pub(crate) async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/v1/check",
            "/v1/users/{principal_id}/permissions",
            "/v1/users/{principal_id}/roles",
            "/v1/users/roles/batch",
            "/v1/users/{principal_id}/menu",
            "/v1/roles",
            "/v1/roles/{role_key}",
            "/v1/roles/{role_key}/permissions",
            "/v1/permissions",
            "/v1/permissions/{permission_key}",
            "/v1/menus",
            "/v1/menus/{id}",
            "/v1/menus/{id}/guard",
            "/v1/changes",
            "/v1/system/health",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
