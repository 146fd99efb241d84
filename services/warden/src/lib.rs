//! Role-based access control service.
//!
//! Resolves a principal's effective permissions from role grants, administers
//! roles, permissions, and a navigation menu tree, and projects that tree onto
//! what each principal may see.
pub mod api;
pub mod app;
pub mod audit;
pub mod authz;
pub mod config;
pub mod menu;
pub mod model;
pub mod observability;
pub mod principal;
pub mod store;
