//! Per-principal menu visibility.
//!
//! A node is visible when the principal can reach it through permissions they
//! hold, or when it sits on the route to such a node:
//!
//! - Only *live* nodes take part: enabled, with every ancestor enabled.
//! - Seeds are live nodes whose guard the principal holds, plus unguarded
//!   leaves with no withheld guard between them and their root.
//! - Everything below a seed is visible regardless of its own guard.
//! - Every ancestor of a seed is visible, but does not open its siblings.
use super::service::MenuService;
use super::tree::MenuIndex;
use crate::authz::keys::validate_principal_id;
use crate::authz::{AuthorizationResolver, AuthzResult, MenuForest};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;

#[derive(Clone)]
pub struct MenuEngine {
    resolver: AuthorizationResolver,
    menus: MenuService,
}

impl MenuEngine {
    pub fn new(resolver: AuthorizationResolver, menus: MenuService) -> Self {
        Self { resolver, menus }
    }

    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn resolve_visible_menu(&self, principal_id: &str) -> AuthzResult<MenuForest> {
        validate_principal_id(principal_id)?;
        if let Some(cached) = self.resolver.cached_menu(principal_id).await {
            return Ok(cached);
        }

        let observed = self.resolver.generation();
        let permissions = self.resolver.resolve_permissions(principal_id).await?;
        let index = self.menus.snapshot().await?;
        let visible = visible_node_ids(&index, &permissions);
        let forest: MenuForest = Arc::new(index.forest(|node| visible.contains(node.id.as_str())));

        metrics::counter!("warden_menu_resolutions_total").increment(1);
        tracing::debug!(principal_id, visible = visible.len(), "menu resolved");
        self.resolver
            .cache_menu(principal_id, Arc::clone(&forest), observed)
            .await;
        Ok(forest)
    }
}

/// Ids of the nodes `permissions` makes visible in `index`.
pub fn visible_node_ids<'a>(
    index: &'a MenuIndex,
    permissions: &BTreeSet<String>,
) -> HashSet<&'a str> {
    let holds = |guard: &Option<String>| guard.as_ref().is_none_or(|key| permissions.contains(key));

    let live: HashSet<&str> = index
        .nodes()
        .filter(|node| node.enabled && index.ancestors(&node.id).iter().all(|a| a.enabled))
        .map(|node| node.id.as_str())
        .collect();

    let mut seeds = Vec::new();
    for id in &live {
        let Some(node) = index.get(id) else { continue };
        let seeded = match &node.permission_key {
            Some(key) => permissions.contains(key),
            None => {
                let leaf = index.children(id).iter().all(|child| !live.contains(child.as_str()));
                leaf && index
                    .ancestors(id)
                    .iter()
                    .all(|ancestor| holds(&ancestor.permission_key))
            }
        };
        if seeded {
            seeds.push(*id);
        }
    }

    let mut visible: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = seeds.iter().copied().collect();
    while let Some(id) = queue.pop_front() {
        if !visible.insert(id) {
            continue;
        }
        queue.extend(
            index
                .children(id)
                .iter()
                .map(String::as_str)
                .filter(|child| live.contains(child)),
        );
    }
    for id in seeds {
        visible.extend(index.ancestors(id).into_iter().map(|node| node.id.as_str()));
    }
    visible
}
