//! Role and permission records.
//!
//! # Purpose
//! Defines the two node types of the grant graph. Edges between them
//! (role grants, principal assignments) are plain key pairs owned by the store.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A named bundle of permissions.
///
/// `key` is the stable identifier; `name` is display-only and may change.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct Role {
    pub key: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An opaque capability string plus descriptive metadata.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct Permission {
    pub key: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a role.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct NewRole {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Fields accepted when creating a permission.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct NewPermission {
    pub key: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
}

/// Partial role update. Empty strings are treated the same as absent fields.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct RolePatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl RolePatch {
    pub fn apply(&self, role: &mut Role) {
        if let Some(name) = non_empty(&self.name) {
            role.name = name.to_string();
        }
        if let Some(description) = non_empty(&self.description) {
            role.description = description.to_string();
        }
    }
}

/// Partial permission update. Empty strings are treated the same as absent fields.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct PermissionPatch {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
}

impl PermissionPatch {
    pub fn apply(&self, permission: &mut Permission) {
        if let Some(name) = non_empty(&self.name) {
            permission.name = name.to_string();
        }
        if let Some(kind) = non_empty(&self.kind) {
            permission.kind = kind.to_string();
        }
        if let Some(description) = non_empty(&self.description) {
            permission.description = description.to_string();
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}
