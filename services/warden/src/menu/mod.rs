//! Navigation menu administration and per-principal visibility.
//!
//! [`MenuService`] owns writes to the tree and keeps it well formed;
//! [`MenuEngine`] projects the tree onto a principal's resolved permissions.
mod engine;
mod service;
mod tree;
mod validator;

pub use engine::{MenuEngine, visible_node_ids};
pub use service::MenuService;
pub use tree::MenuIndex;
pub use validator::TreeValidator;

/// Maximum number of levels from a root, inclusive.
pub const DEFAULT_MAX_DEPTH: usize = 3;
