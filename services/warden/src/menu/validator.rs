//! Structural checks run before any menu write.
use super::tree::MenuIndex;
use crate::authz::{AuthzError, AuthzResult};
use crate::authz::keys::validate_route_path;

#[derive(Debug, Clone, Copy)]
pub struct TreeValidator {
    max_depth: usize,
}

impl TreeValidator {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn check_create(
        &self,
        index: &MenuIndex,
        path: &str,
        parent_id: Option<&str>,
    ) -> AuthzResult<()> {
        self.check_path(index, None, path)?;
        if let Some(parent_id) = parent_id {
            self.check_parent(index, None, parent_id)?;
        }
        Ok(())
    }

    /// `path` and `parent_id` are the values the node will have after the update.
    pub fn check_update(
        &self,
        index: &MenuIndex,
        node_id: &str,
        path: &str,
        parent_id: Option<&str>,
    ) -> AuthzResult<()> {
        if index.get(node_id).is_none() {
            return Err(AuthzError::NotFound(format!("menu node {node_id}")));
        }
        self.check_path(index, Some(node_id), path)?;
        if let Some(parent_id) = parent_id {
            self.check_parent(index, Some(node_id), parent_id)?;
        }
        Ok(())
    }

    pub fn check_delete(&self, index: &MenuIndex, node_id: &str) -> AuthzResult<()> {
        if index.get(node_id).is_none() {
            return Err(AuthzError::NotFound(format!("menu node {node_id}")));
        }
        if !index.children(node_id).is_empty() {
            return Err(AuthzError::Conflict(format!(
                "menu node {node_id} has children"
            )));
        }
        Ok(())
    }

    fn check_path(&self, index: &MenuIndex, node_id: Option<&str>, path: &str) -> AuthzResult<()> {
        validate_route_path(path)?;
        match index.find_by_path(path) {
            Some(existing) if Some(existing.id.as_str()) != node_id => Err(AuthzError::Conflict(
                format!("menu path {path} is already used"),
            )),
            _ => Ok(()),
        }
    }

    fn check_parent(
        &self,
        index: &MenuIndex,
        node_id: Option<&str>,
        parent_id: &str,
    ) -> AuthzResult<()> {
        if index.get(parent_id).is_none() {
            return Err(AuthzError::NotFound(format!("parent menu node {parent_id}")));
        }
        let height = match node_id {
            Some(node_id) => {
                let loops = parent_id == node_id
                    || index.ancestors(parent_id).iter().any(|node| node.id == node_id);
                if loops {
                    return Err(AuthzError::Conflict(format!(
                        "moving {node_id} under {parent_id} would create a cycle"
                    )));
                }
                index.height(node_id)
            }
            None => 1,
        };
        let deepest = index.depth(parent_id) + height;
        if deepest > self.max_depth {
            return Err(AuthzError::Conflict(format!(
                "menu depth {deepest} exceeds maximum {}",
                self.max_depth
            )));
        }
        Ok(())
    }
}
