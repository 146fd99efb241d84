//! Menu node records and the nested view returned to callers.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// One entry of the administrative navigation tree, stored flat.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct MenuNode {
    pub id: String,
    pub name: String,
    pub path: String,
    pub icon: String,
    /// Permission required to see this node; `None` leaves the node open.
    pub permission_key: Option<String>,
    pub parent_id: Option<String>,
    pub order: i32,
    pub enabled: bool,
    #[schema(value_type = Object)]
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A menu node with its children attached, siblings ordered by `order`.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct MenuTreeNode {
    pub id: String,
    pub name: String,
    pub path: String,
    pub icon: String,
    pub permission_key: Option<String>,
    pub parent_id: Option<String>,
    pub order: i32,
    pub enabled: bool,
    #[schema(value_type = Object)]
    pub meta: serde_json::Value,
    pub children: Vec<MenuTreeNode>,
}

impl From<&MenuNode> for MenuTreeNode {
    fn from(node: &MenuNode) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            path: node.path.clone(),
            icon: node.icon.clone(),
            permission_key: node.permission_key.clone(),
            parent_id: node.parent_id.clone(),
            order: node.order,
            enabled: node.enabled,
            meta: node.meta.clone(),
            children: Vec::new(),
        }
    }
}

/// Fields accepted when creating a menu node. `parent_id: None` creates a root.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct NewMenuNode {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub permission_key: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub meta: serde_json::Value,
}

/// Partial menu node update. The guard is changed separately.
///
/// `parent_id` distinguishes "absent" (keep) from `null` (move to root).
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct MenuNodePatch {
    pub name: Option<String>,
    pub path: Option<String>,
    pub icon: Option<String>,
    #[serde(default, deserialize_with = "present_or_null")]
    #[schema(value_type = Option<String>)]
    pub parent_id: Option<Option<String>>,
    pub order: Option<i32>,
    pub enabled: Option<bool>,
    #[schema(value_type = Option<Object>)]
    pub meta: Option<serde_json::Value>,
}

impl MenuNodePatch {
    pub fn apply(&self, node: &mut MenuNode) {
        if let Some(name) = self.name.as_deref().filter(|name| !name.is_empty()) {
            node.name = name.to_string();
        }
        if let Some(path) = self.path.as_deref().filter(|path| !path.is_empty()) {
            node.path = path.to_string();
        }
        if let Some(icon) = &self.icon {
            node.icon = icon.clone();
        }
        if let Some(parent_id) = &self.parent_id {
            node.parent_id = parent_id.clone();
        }
        if let Some(order) = self.order {
            node.order = order;
        }
        if let Some(enabled) = self.enabled {
            node.enabled = enabled;
        }
        if let Some(meta) = &self.meta {
            node.meta = meta.clone();
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}
