//! Request and response bodies for the HTTP API.
use crate::model::{ChangeRecord, MenuTreeNode, Permission, Role};
use crate::store::Page;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
    pub api_version: String,
    pub backend: String,
    pub durable: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CheckRequest {
    pub principal_id: String,
    pub permission_key: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CheckResponse {
    pub principal_id: String,
    pub permission_key: String,
    pub allowed: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PermissionKeysRequest {
    pub permission_keys: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RoleKeysRequest {
    pub role_keys: Vec<String>,
}

/// Edges created by an assignment; already-held targets are omitted.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct AssignedResponse {
    pub added: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct UnassignedResponse {
    pub removed: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct BatchUserRolesRequest {
    pub principal_ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct BatchUserRolesResponse {
    pub items: BTreeMap<String, Vec<Role>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RoleListResponse {
    pub items: Vec<Role>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl From<Page<Role>> for RoleListResponse {
    fn from(page: Page<Role>) -> Self {
        Self {
            items: page.items,
            total: page.total,
            page: page.page,
            page_size: page.page_size,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PermissionListResponse {
    pub items: Vec<Permission>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl From<Page<Permission>> for PermissionListResponse {
    fn from(page: Page<Permission>) -> Self {
        Self {
            items: page.items,
            total: page.total,
            page: page.page,
            page_size: page.page_size,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PermissionsResponse {
    pub items: Vec<Permission>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RolesResponse {
    pub items: Vec<Role>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct MenuTreeResponse {
    pub items: Vec<MenuTreeNode>,
}

/// `permission_key: null` removes the guard.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct MenuGuardRequest {
    #[serde(default)]
    pub permission_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ChangeListResponse {
    pub items: Vec<ChangeRecord>,
    pub next_seq: u64,
}
