//! Read-only index over a flat list of menu nodes.
use crate::model::{MenuNode, MenuTreeNode};
use std::collections::{HashMap, HashSet};

/// Parent/child lookups for one snapshot of the menu tree.
///
/// Siblings are kept sorted by `(order, path)`. A node whose parent is
/// missing from the snapshot is treated as a root.
#[derive(Debug, Default)]
pub struct MenuIndex {
    nodes: HashMap<String, MenuNode>,
    children: HashMap<String, Vec<String>>,
    roots: Vec<String>,
}

impl MenuIndex {
    pub fn new(nodes: Vec<MenuNode>) -> Self {
        let nodes: HashMap<String, MenuNode> =
            nodes.into_iter().map(|node| (node.id.clone(), node)).collect();
        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        let mut roots = Vec::new();
        for node in nodes.values() {
            match node.parent_id.as_deref() {
                Some(parent) if nodes.contains_key(parent) => children
                    .entry(parent.to_string())
                    .or_default()
                    .push(node.id.clone()),
                _ => roots.push(node.id.clone()),
            }
        }
        let sort_key = |id: &String| {
            let node = &nodes[id];
            (node.order, node.path.clone())
        };
        roots.sort_by_key(sort_key);
        for siblings in children.values_mut() {
            siblings.sort_by_key(sort_key);
        }
        Self {
            nodes,
            children,
            roots,
        }
    }

    pub fn get(&self, id: &str) -> Option<&MenuNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &MenuNode> {
        self.nodes.values()
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn children(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find_by_path(&self, path: &str) -> Option<&MenuNode> {
        self.nodes.values().find(|node| node.path == path)
    }

    /// Parent first, root last. Stops early if the stored data loops.
    pub fn ancestors(&self, id: &str) -> Vec<&MenuNode> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut current = self.nodes.get(id).and_then(|node| node.parent_id.as_deref());
        while let Some(parent_id) = current {
            if !seen.insert(parent_id) {
                break;
            }
            let Some(parent) = self.nodes.get(parent_id) else {
                break;
            };
            out.push(parent);
            current = parent.parent_id.as_deref();
        }
        out
    }

    /// 1 for a root.
    pub fn depth(&self, id: &str) -> usize {
        self.ancestors(id).len() + 1
    }

    /// Levels in the subtree rooted at `id`; 1 for a leaf.
    pub fn height(&self, id: &str) -> usize {
        let mut height = 0;
        let mut level = vec![id];
        let mut seen = HashSet::new();
        while !level.is_empty() {
            height += 1;
            level = level
                .into_iter()
                .filter(|id| seen.insert(*id))
                .flat_map(|id| self.children(id).iter().map(String::as_str))
                .collect();
        }
        height
    }

    /// Nests every node accepted by `include` under its parent.
    ///
    /// A node is only reached through an included parent, so callers must
    /// pass an ancestor-closed selection.
    pub fn forest<F>(&self, include: F) -> Vec<MenuTreeNode>
    where
        F: Fn(&MenuNode) -> bool,
    {
        self.roots
            .iter()
            .filter_map(|id| self.subtree(id, &include))
            .collect()
    }

    fn subtree<F>(&self, id: &str, include: &F) -> Option<MenuTreeNode>
    where
        F: Fn(&MenuNode) -> bool,
    {
        let node = self.nodes.get(id).filter(|node| include(node))?;
        let mut tree = MenuTreeNode::from(node);
        tree.children = self
            .children(id)
            .iter()
            .filter_map(|child| self.subtree(child, include))
            .collect();
        Some(tree)
    }
}
