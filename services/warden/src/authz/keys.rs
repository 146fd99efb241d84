//! Key and path format checks run before any write.
use super::error::{AuthzError, AuthzResult};
use regex::Regex;
use std::sync::LazyLock;

static ROLE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("role key pattern"));
static PERMISSION_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_:.\-]+$").expect("permission key pattern"));
static ROUTE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/[a-zA-Z0-9_\-/]*$").expect("route path pattern"));

pub fn validate_role_key(key: &str) -> AuthzResult<()> {
    if ROLE_KEY.is_match(key) {
        Ok(())
    } else {
        Err(AuthzError::Validation(format!("invalid role key: {key:?}")))
    }
}

pub fn validate_permission_key(key: &str) -> AuthzResult<()> {
    if PERMISSION_KEY.is_match(key) {
        Ok(())
    } else {
        Err(AuthzError::Validation(format!(
            "invalid permission key: {key:?}"
        )))
    }
}

pub fn validate_route_path(path: &str) -> AuthzResult<()> {
    if ROUTE_PATH.is_match(path) {
        Ok(())
    } else {
        Err(AuthzError::Validation(format!("invalid menu path: {path:?}")))
    }
}

pub fn validate_principal_id(principal_id: &str) -> AuthzResult<()> {
    if principal_id.trim().is_empty() {
        return Err(AuthzError::Validation("principal id is required".into()));
    }
    Ok(())
}

/// Validates every key and returns them deduplicated in first-seen order.
pub(crate) fn normalize_keys(
    keys: &[String],
    what: &str,
    validate: fn(&str) -> AuthzResult<()>,
) -> AuthzResult<Vec<String>> {
    if keys.is_empty() {
        return Err(AuthzError::Validation(format!("at least one {what} is required")));
    }
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(keys.len());
    for key in keys {
        validate(key)?;
        if seen.insert(key.as_str()) {
            out.push(key.clone());
        }
    }
    Ok(out)
}
