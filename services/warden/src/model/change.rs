//! Immutable change records for grant and menu mutations.
//!
//! # Purpose
//! Captures who changed what (actor, action, target) with before/after
//! snapshots. Records are appended to a change sink and never updated.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorType {
    User,
    Service,
}

/// The caller responsible for a mutation.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub kind: ActorType,
}

impl Actor {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ActorType::User,
        }
    }

    pub fn service(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ActorType::Service,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeAction {
    CreateRole,
    UpdateRole,
    DeleteRole,
    CreatePermission,
    UpdatePermission,
    DeletePermission,
    AssignRolePermission,
    UnassignRolePermission,
    AssignUserRole,
    UnassignUserRole,
    CreateMenu,
    UpdateMenu,
    DeleteMenu,
    UpdateMenuPermission,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetType {
    Role,
    Permission,
    RolePermission,
    UserRole,
    Menu,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeStatus {
    Success,
    Failure,
}

/// One appended history entry. `seq` is assigned by the log that stores it.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct ChangeRecord {
    pub seq: u64,
    pub actor_id: String,
    pub actor_type: ActorType,
    pub action: ChangeAction,
    pub target_type: TargetType,
    pub target_key: String,
    #[schema(value_type = Option<Object>)]
    pub before: Option<serde_json::Value>,
    #[schema(value_type = Option<Object>)]
    pub after: Option<serde_json::Value>,
    pub status: ChangeStatus,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ChangeRecord {
    pub fn success(
        actor: &Actor,
        action: ChangeAction,
        target_type: TargetType,
        target_key: impl Into<String>,
    ) -> Self {
        Self {
            seq: 0,
            actor_id: actor.id.clone(),
            actor_type: actor.kind,
            action,
            target_type,
            target_key: target_key.into(),
            before: None,
            after: None,
            status: ChangeStatus::Success,
            details: None,
            created_at: Utc::now(),
        }
    }

    pub fn failure(
        actor: &Actor,
        action: ChangeAction,
        target_type: TargetType,
        target_key: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        let mut record = Self::success(actor, action, target_type, target_key);
        record.status = ChangeStatus::Failure;
        record.details = Some(details.into());
        record
    }

    pub fn with_before<T: Serialize>(mut self, value: &T) -> Self {
        self.before = serde_json::to_value(value).ok();
        self
    }

    pub fn with_after<T: Serialize>(mut self, value: &T) -> Self {
        self.after = serde_json::to_value(value).ok();
        self
    }
}

/// Filter for reading back change history, paged by sequence number.
#[derive(Debug, Clone, Default)]
pub struct ChangeQuery {
    /// Inclusive lower bound on `seq`.
    pub since: u64,
    pub limit: usize,
    pub target_type: Option<TargetType>,
    pub target_key: Option<String>,
    pub action: Option<ChangeAction>,
}

impl ChangeQuery {
    pub fn matches(&self, record: &ChangeRecord) -> bool {
        record.seq >= self.since
            && self.target_type.is_none_or(|t| t == record.target_type)
            && self
                .target_key
                .as_deref()
                .is_none_or(|key| key == record.target_key)
            && self.action.is_none_or(|a| a == record.action)
    }
}

macro_rules! string_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("unknown {}: {other}", stringify!($ty))),
                }
            }
        }
    };
}

string_enum!(ActorType {
    User => "USER",
    Service => "SERVICE",
});

string_enum!(ChangeAction {
    CreateRole => "CREATE_ROLE",
    UpdateRole => "UPDATE_ROLE",
    DeleteRole => "DELETE_ROLE",
    CreatePermission => "CREATE_PERMISSION",
    UpdatePermission => "UPDATE_PERMISSION",
    DeletePermission => "DELETE_PERMISSION",
    AssignRolePermission => "ASSIGN_ROLE_PERMISSION",
    UnassignRolePermission => "UNASSIGN_ROLE_PERMISSION",
    AssignUserRole => "ASSIGN_USER_ROLE",
    UnassignUserRole => "UNASSIGN_USER_ROLE",
    CreateMenu => "CREATE_MENU",
    UpdateMenu => "UPDATE_MENU",
    DeleteMenu => "DELETE_MENU",
    UpdateMenuPermission => "UPDATE_MENU_PERMISSION",
});

string_enum!(TargetType {
    Role => "ROLE",
    Permission => "PERMISSION",
    RolePermission => "ROLE_PERMISSION",
    UserRole => "USER_ROLE",
    Menu => "MENU",
});

string_enum!(ChangeStatus {
    Success => "SUCCESS",
    Failure => "FAILURE",
});
