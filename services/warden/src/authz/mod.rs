//! Authorization core: permission resolution, caching, and grant administration.
//!
//! # Purpose
//! Answers "does principal P hold permission K" from the grant graph and keeps
//! the process-local cache coherent with every grant mutation.
//!
//! # Notes
//! - [`resolver::AuthorizationResolver`] is the only component that reads the
//!   cache; administrative services call into it to invalidate.
//! - Resolution fails closed: a store error is returned to the caller and
//!   nothing is cached.
pub mod cache;
pub mod catalog;
pub mod error;
pub mod grants;
pub mod keys;
pub mod resolver;

pub use cache::ExpiringCache;
pub use catalog::CatalogService;
pub use error::{AuthzError, AuthzResult};
pub use grants::GrantService;
pub use resolver::{AuthorizationResolver, MenuForest, PermissionSet};
