//! Per-type discovery policy: how a resource class lists its children,
//! locates its parent, and which IAM/policy sub-queries apply to it.
//!
//! Kept as one table so type-specific behavior never scatters across the
//! builder.

use sw_domain::identifier::{
    ResourceType, MANAGEMENT_GROUP_TYPE, RESOURCE_GROUP_TYPE, SUBSCRIPTION_TYPE,
};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Strategies
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildrenStrategy {
    /// `GET {id}/descendants` — full transitive subtree, partitioned into
    /// direct children and linked resources.
    Descendants,
    /// `GET {id}/resourceGroups`.
    ResourceGroups,
    /// `GET {id}/resources`.
    Resources,
    NoListing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentStrategy {
    /// Read `properties.details.parent.id` from the node's own payload.
    PayloadDetails,
    /// Consult the parent hint map; on miss, scan the management-group
    /// hierarchy until the hint map can answer.
    HintOrScan,
    /// Extract the `/subscriptions/{guid}` prefix from the identifier.
    SubscriptionPrefix,
    /// Strip the trailing provider suffix; the remainder is the parent.
    TrimProviderSuffix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectKind {
    RoleDefinitions,
    RoleAssignments,
    PolicyDefinitions,
    PolicySetDefinitions,
    PolicyAssignments,
}

impl AspectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RoleDefinitions => "roleDefinitions",
            Self::RoleAssignments => "roleAssignments",
            Self::PolicyDefinitions => "policyDefinitions",
            Self::PolicySetDefinitions => "policySetDefinitions",
            Self::PolicyAssignments => "policyAssignments",
        }
    }
}

/// One aspect sub-query: the suffix appended to a scope identifier and the
/// result slot it fills.
#[derive(Debug, Clone, Copy)]
pub struct AspectQuery {
    pub kind: AspectKind,
    pub suffix: &'static str,
}

const ROLE_DEFINITIONS: AspectQuery = AspectQuery {
    kind: AspectKind::RoleDefinitions,
    suffix: "/providers/Microsoft.Authorization/roleDefinitions",
};
const ROLE_ASSIGNMENTS: AspectQuery = AspectQuery {
    kind: AspectKind::RoleAssignments,
    suffix: "/providers/Microsoft.Authorization/roleAssignments?$filter=atScope()",
};
const POLICY_DEFINITIONS: AspectQuery = AspectQuery {
    kind: AspectKind::PolicyDefinitions,
    suffix: "/providers/Microsoft.Authorization/policyDefinitions",
};
const POLICY_SET_DEFINITIONS: AspectQuery = AspectQuery {
    kind: AspectKind::PolicySetDefinitions,
    suffix: "/providers/Microsoft.Authorization/policySetDefinitions",
};
const POLICY_ASSIGNMENTS: AspectQuery = AspectQuery {
    kind: AspectKind::PolicyAssignments,
    suffix: "/providers/Microsoft.Authorization/policyAssignments?$filter=atScope()",
};

const SCOPE_IAM: &[AspectQuery] = &[ROLE_DEFINITIONS, ROLE_ASSIGNMENTS];
const FULL_POLICY: &[AspectQuery] =
    &[POLICY_DEFINITIONS, POLICY_SET_DEFINITIONS, POLICY_ASSIGNMENTS];
const ASSIGNMENTS_ONLY: &[AspectQuery] = &[POLICY_ASSIGNMENTS];
const NONE: &[AspectQuery] = &[];

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// The table
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy)]
pub struct TypePolicy {
    pub children: ChildrenStrategy,
    pub parent: ParentStrategy,
    pub iam_queries: &'static [AspectQuery],
    pub policy_queries: &'static [AspectQuery],
}

pub fn policy_for(resource_type: &ResourceType) -> TypePolicy {
    if resource_type.is(MANAGEMENT_GROUP_TYPE) {
        TypePolicy {
            children: ChildrenStrategy::Descendants,
            parent: ParentStrategy::PayloadDetails,
            iam_queries: SCOPE_IAM,
            policy_queries: FULL_POLICY,
        }
    } else if resource_type.is(SUBSCRIPTION_TYPE) {
        TypePolicy {
            children: ChildrenStrategy::ResourceGroups,
            parent: ParentStrategy::HintOrScan,
            iam_queries: SCOPE_IAM,
            policy_queries: FULL_POLICY,
        }
    } else if resource_type.is(RESOURCE_GROUP_TYPE) {
        TypePolicy {
            children: ChildrenStrategy::Resources,
            parent: ParentStrategy::SubscriptionPrefix,
            iam_queries: SCOPE_IAM,
            policy_queries: ASSIGNMENTS_ONLY,
        }
    } else {
        TypePolicy {
            children: ChildrenStrategy::NoListing,
            parent: ParentStrategy::TrimProviderSuffix,
            iam_queries: NONE,
            policy_queries: NONE,
        }
    }
}
