//! Warden data model module.
//!
//! # Purpose
//! Re-exports the grant-graph records (roles, permissions), menu nodes, and
//! the immutable change records shared by the store, service, and API layers.
mod change;
mod grant;
mod menu;

pub use change::{
    Actor, ActorType, ChangeAction, ChangeQuery, ChangeRecord, ChangeStatus, TargetType,
};
pub use grant::{NewPermission, NewRole, Permission, PermissionPatch, Role, RolePatch};
pub use menu::{MenuNode, MenuNodePatch, MenuTreeNode, NewMenuNode};
