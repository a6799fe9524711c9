//! The recursion driver: walks from a root identifier level by level,
//! filtering each node's children through the caller's inclusion plan and
//! handing the survivors to the bulk fetcher until a pass yields nothing
//! new.
//!
//! The driver is the only place that knows which resource classes a
//! traversal finds interesting; the rest of the engine is type-agnostic.

use std::collections::HashSet;

use sw_domain::config::TraversalConfig;
use sw_domain::error::Result;
use sw_domain::identifier::{
    ResourceId, MANAGEMENT_GROUP_TYPE, RESOURCE_GROUP_TYPE, SUBSCRIPTION_TYPE,
};
use sw_domain::node::{ResourceRef, StateNode};

use crate::bulk::BulkResult;
use crate::engine::DiscoveryEngine;

fn plan_includes(plan: &TraversalConfig, child: &ResourceRef) -> bool {
    let t = &child.resource_type;
    if t.is(MANAGEMENT_GROUP_TYPE) {
        plan.include_management_groups
    } else if t.is(SUBSCRIPTION_TYPE) {
        plan.include_subscriptions
    } else if t.is(RESOURCE_GROUP_TYPE) {
        plan.include_resource_groups
    } else {
        // Unknown provider types count as resources.
        plan.include_resources
    }
}

impl DiscoveryEngine {
    /// Discover the tree under `root` according to `plan`.
    ///
    /// The root build failing is fatal; everything below it is best-effort
    /// and reported through the result's diagnostics.
    pub async fn traverse(
        &self,
        root: impl Into<ResourceId>,
        plan: &TraversalConfig,
    ) -> Result<BulkResult> {
        let mode = plan.discovery_mode();
        let (root_node, mut diagnostics) = self
            .build_traced(root.into(), self.config.cache_mode, mode)
            .await?;

        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(root_node.id.key());
        let mut nodes = vec![root_node.clone()];

        if !plan.recurse {
            return Ok(BulkResult { nodes, diagnostics });
        }

        let mut frontier = self.eligible_children(&root_node, plan, &mut seen);
        while !frontier.is_empty() && !self.cancel.is_cancelled() {
            tracing::debug!(frontier = frontier.len(), "traversal pass");
            let pass = self
                .from_ids(
                    frontier,
                    self.config.throttle_limit,
                    self.config.cache_mode,
                    mode,
                )
                .await;
            diagnostics.extend(pass.diagnostics);

            let mut next = Vec::new();
            for node in pass.nodes {
                next.extend(self.eligible_children(&node, plan, &mut seen));
                nodes.push(node);
            }
            frontier = next;
        }

        Ok(BulkResult { nodes, diagnostics })
    }

    /// Children of `node` the plan descends into: inclusion flags applied,
    /// exclusions (from the plan and the engine config) pruned, and each
    /// survivor marked seen so no later pass re-adds it.
    fn eligible_children(
        &self,
        node: &StateNode,
        plan: &TraversalConfig,
        seen: &mut HashSet<String>,
    ) -> Vec<ResourceId> {
        node.children
            .iter()
            .filter(|child| plan_includes(plan, child))
            .filter(|child| !self.is_excluded(plan, &child.id))
            .filter(|child| seen.insert(child.id.key()))
            .map(|child| child.id.clone())
            .collect()
    }

    /// Exact-match, case-insensitive exclusion test.
    fn is_excluded(&self, plan: &TraversalConfig, id: &ResourceId) -> bool {
        plan.exclude_path_ids
            .iter()
            .chain(self.config.exclude_path_ids.iter())
            .any(|excluded| excluded.eq_ignore_ascii_case(id.as_str()))
    }
}
