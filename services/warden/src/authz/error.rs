//! Error taxonomy shared by the authorization and menu services.
use crate::principal::DirectoryError;
use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthzError {
    /// Malformed key, path, or request shape. Nothing was written.
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// Duplicate key, cycle, depth overflow, or deleting a node with children.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Grant store or principal directory unreachable. Callers must deny.
    #[error("upstream unavailable: {0}")]
    Upstream(anyhow::Error),
}

pub type AuthzResult<T> = Result<T, AuthzError>;

impl From<StoreError> for AuthzError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AuthzError::NotFound(what),
            StoreError::Conflict(what) => AuthzError::Conflict(what),
            StoreError::Unexpected(err) => AuthzError::Upstream(err),
        }
    }
}

impl From<DirectoryError> for AuthzError {
    fn from(err: DirectoryError) -> Self {
        AuthzError::Upstream(err.into())
    }
}
