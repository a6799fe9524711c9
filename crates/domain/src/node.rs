//! The state record assembled for every discovered resource.

use crate::config::DiscoveryMode;
use crate::error::Result;
use crate::identifier::{ResourceId, ResourceType};
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// References and aspects
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A typed link to another resource (child, parent, or IAM/policy record).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: ResourceId,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
}

impl ResourceRef {
    pub fn new(id: impl Into<ResourceId>, resource_type: impl Into<ResourceType>) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
        }
    }

    /// Build a reference from an identifier alone, deriving its type.
    pub fn from_id(id: impl Into<ResourceId>) -> Result<Self> {
        let id = id.into();
        let resource_type = ResourceType::derive(id.as_str())?;
        Ok(Self { id, resource_type })
    }
}

/// Access-control records attached to a scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IamAspect {
    pub role_definitions: Vec<ResourceRef>,
    pub role_assignments: Vec<ResourceRef>,
}

/// Governance records attached to a scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyAspect {
    pub policy_definitions: Vec<ResourceRef>,
    pub policy_set_definitions: Vec<ResourceRef>,
    pub policy_assignments: Vec<ResourceRef>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// StateNode
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An immutable-after-build snapshot of one resource: its raw payload,
/// type-derived relations, IAM and policy associations, and computed
/// hierarchical path.
///
/// Nodes are constructed exactly once per identifier per cache generation.
/// The only post-publish change allowed is the monotonic aspect merge
/// (`with_merged_aspects`), which adds IAM/policy lists but never removes
/// or rewrites anything already present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateNode {
    /// Canonical resource identifier.
    pub id: ResourceId,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    /// Display name (subscriptions use `displayName`, others the payload
    /// `name` or the trailing id segment).
    pub name: String,
    /// Full decoded API response body.
    pub raw: serde_json::Value,
    /// Namespace portion of `resource_type`.
    pub provider: String,
    /// Records directly subordinate in the tenant tree.
    pub children: Vec<ResourceRef>,
    /// Records discovered via the same call as `children` but not
    /// directly subordinate (e.g. deeper descendants).
    pub linked_resources: Vec<ResourceRef>,
    /// Immediate parent; `None` at a hierarchy root.
    pub parent: Option<ResourceRef>,
    /// Ordered ancestor chain, root first, immediate parent last.
    pub parents: Vec<ResourceRef>,
    /// `/`-joined trailing segments of each ancestor id.
    pub parent_path: String,
    /// `parent_path` plus this node's own trailing segment.
    pub resource_path: String,
    pub iam: IamAspect,
    pub policy: PolicyAspect,
    /// Which optional aspects have been populated on this snapshot.
    pub aspects: DiscoveryMode,
}

impl StateNode {
    /// Depth in the tenant tree (number of ancestors).
    pub fn depth(&self) -> usize {
        self.parents.len()
    }

    /// Clone this node with additional aspect data merged in.
    ///
    /// The merge is monotonic: an aspect already carried by `self` is kept
    /// as-is and the incoming copy ignored, so concurrent upgraders
    /// converge on the same result regardless of ordering.
    pub fn with_merged_aspects(
        &self,
        iam: Option<IamAspect>,
        policy: Option<PolicyAspect>,
        added: DiscoveryMode,
    ) -> StateNode {
        let mut merged = self.clone();
        if !merged.aspects.includes_iam() {
            if let Some(iam) = iam {
                merged.iam = iam;
            }
        }
        if !merged.aspects.includes_policy() {
            if let Some(policy) = policy {
                merged.policy = policy;
            }
        }
        merged.aspects = merged.aspects.union(added);
        merged
    }
}
