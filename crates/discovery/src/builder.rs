//! Constructs a `StateNode` from an identifier: fetch the raw config,
//! derive the type, gather children/parents/IAM/policy per the type's
//! discovery policy, and install the result in the state cache.

use std::sync::Arc;

use serde_json::Value;
use sw_domain::config::{CacheMode, DiscoveryMode};
use sw_domain::diagnostics::Diagnostic;
use sw_domain::error::{Error, Result};
use sw_domain::identifier::{ResourceId, ResourceType, SUBSCRIPTION_TYPE};
use sw_domain::node::{IamAspect, PolicyAspect, ResourceRef, StateNode};

use crate::children::{resource_ref_from, ChildListing};
use crate::engine::DiscoveryEngine;
use crate::policy::{policy_for, AspectKind};
use crate::response_cache::Payload;

fn display_name(id: &ResourceId, resource_type: &ResourceType, raw: &Value) -> String {
    if resource_type.is(SUBSCRIPTION_TYPE) {
        if let Some(name) = raw.get("displayName").and_then(Value::as_str) {
            return name.to_owned();
        }
    }
    raw.get("name")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| id.short_name().to_owned())
}

impl DiscoveryEngine {
    /// Build (or serve from cache) the node for `id`.
    ///
    /// `UseCache` returns the cached node when present, upgrading it in
    /// place when `discovery_mode` asks for aspects the cached snapshot
    /// lacks. `SkipCache` rebuilds from a fresh primary fetch without
    /// reading or writing the state cache.
    ///
    /// Recovered failures (denied parents, failed aspect queries) are
    /// logged where they happen; use [`DiscoveryEngine::from_ids`] to
    /// collect them as diagnostics.
    pub async fn build(
        &self,
        id: impl Into<ResourceId>,
        cache_mode: CacheMode,
        discovery_mode: DiscoveryMode,
    ) -> Result<Arc<StateNode>> {
        let (node, _diagnostics) = self
            .build_traced(id.into(), cache_mode, discovery_mode)
            .await?;
        Ok(node)
    }

    /// `build` plus the diagnostics of every recovered failure.
    pub(crate) async fn build_traced(
        &self,
        id: ResourceId,
        cache_mode: CacheMode,
        requested: DiscoveryMode,
    ) -> Result<(Arc<StateNode>, Vec<Diagnostic>)> {
        if cache_mode == CacheMode::UseCache {
            if let Some(existing) = self.nodes.get(&id) {
                let missing = requested.missing_from(existing.aspects);
                if missing.is_exclude_both() {
                    return Ok((existing, Vec::new()));
                }
                // Upgrade: only the missing aspect queries run; the
                // primary record is not re-fetched.
                let (iam, policy, diagnostics) = self
                    .fetch_aspects(&existing.id, &existing.resource_type, missing)
                    .await;
                let merged = self.nodes.merge_aspects(&existing, iam, policy, missing);
                return Ok((merged, diagnostics));
            }
        }

        // Primary record always comes from the transport so this node's
        // own body is fresh; subordinate calls below go through the cache.
        let payload = self.router.get(id.as_str(), CacheMode::SkipCache).await?;
        let raw = match payload {
            Payload::One(value) => value,
            Payload::Many(_) => return Err(Error::AmbiguousIdentifier(id.to_string())),
        };
        self.build_from_raw(id, raw, cache_mode, requested).await
    }

    /// Assemble and publish a node from an already-obtained body — the
    /// direct-materialization entry point, and the tail of every build.
    pub(crate) async fn build_from_raw(
        &self,
        id: ResourceId,
        raw: Value,
        cache_mode: CacheMode,
        requested: DiscoveryMode,
    ) -> Result<(Arc<StateNode>, Vec<Diagnostic>)> {
        let resource_type = ResourceType::derive(id.as_str())?;
        let provider = resource_type.namespace().to_owned();
        let name = display_name(&id, &resource_type, &raw);
        let mut diagnostics = Vec::new();

        let listing = match self.list_children(&id, &resource_type).await {
            Ok(listing) => listing,
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "children listing failed");
                diagnostics.push(Diagnostic::new(id.to_string(), "children", e.to_string()));
                ChildListing::default()
            }
        };

        let parent = match self.resolve_parent(&id, &resource_type, &raw).await {
            Ok(parent) => parent,
            Err(e) => {
                let e = crate::parents::classify_parent_failure(&id, e);
                tracing::warn!(id = %id, error = %e, "parent lookup failed; treating as root");
                diagnostics.push(Diagnostic::new(id.to_string(), "parent", e.to_string()));
                None
            }
        };

        let (parents, chain_diagnostics) =
            self.resolve_ancestor_chain(&id, parent.clone()).await?;
        diagnostics.extend(chain_diagnostics);

        let parent_path: String = parents
            .iter()
            .map(|p| format!("/{}", p.id.short_name()))
            .collect();
        let resource_path = format!("{parent_path}/{}", id.short_name());

        let (iam, policy, aspect_diagnostics) =
            self.fetch_aspects(&id, &resource_type, requested).await;
        diagnostics.extend(aspect_diagnostics);

        let node = StateNode {
            id,
            resource_type,
            name,
            raw,
            provider,
            children: listing.children,
            linked_resources: listing.linked,
            parent,
            parents,
            parent_path,
            resource_path,
            iam: iam.unwrap_or_default(),
            policy: policy.unwrap_or_default(),
            aspects: requested,
        };

        let published = match cache_mode {
            // Atomic insert-if-absent: a racing winner is kept and this
            // build discarded.
            CacheMode::UseCache => self.nodes.try_publish(node),
            // A bypassing build is handed back without touching the cache.
            CacheMode::SkipCache => Arc::new(node),
        };
        Ok((published, diagnostics))
    }

    /// Run the IAM/policy sub-queries `mode` asks for, per the type's
    /// policy table. A failed query logs, records a diagnostic, and leaves
    /// its slot empty; the aspect still counts as populated so it is not
    /// retried on every later read.
    pub(crate) async fn fetch_aspects(
        &self,
        id: &ResourceId,
        resource_type: &ResourceType,
        mode: DiscoveryMode,
    ) -> (Option<IamAspect>, Option<PolicyAspect>, Vec<Diagnostic>) {
        let table = policy_for(resource_type);
        let mut diagnostics = Vec::new();

        let iam = if mode.includes_iam() {
            let mut aspect = IamAspect::default();
            for query in table.iam_queries {
                match self.fetch_aspect_refs(id, query.suffix).await {
                    Ok(refs) => match query.kind {
                        AspectKind::RoleDefinitions => aspect.role_definitions = refs,
                        AspectKind::RoleAssignments => aspect.role_assignments = refs,
                        _ => {}
                    },
                    Err(e) => {
                        tracing::warn!(id = %id, query = query.kind.as_str(), error = %e, "IAM query failed");
                        diagnostics.push(Diagnostic::new(
                            id.to_string(),
                            query.kind.as_str(),
                            e.to_string(),
                        ));
                    }
                }
            }
            Some(aspect)
        } else {
            None
        };

        let policy = if mode.includes_policy() {
            let mut aspect = PolicyAspect::default();
            for query in table.policy_queries {
                match self.fetch_aspect_refs(id, query.suffix).await {
                    Ok(refs) => match query.kind {
                        AspectKind::PolicyDefinitions => aspect.policy_definitions = refs,
                        AspectKind::PolicySetDefinitions => aspect.policy_set_definitions = refs,
                        AspectKind::PolicyAssignments => aspect.policy_assignments = refs,
                        _ => {}
                    },
                    Err(e) => {
                        tracing::warn!(id = %id, query = query.kind.as_str(), error = %e, "policy query failed");
                        diagnostics.push(Diagnostic::new(
                            id.to_string(),
                            query.kind.as_str(),
                            e.to_string(),
                        ));
                    }
                }
            }
            Some(aspect)
        } else {
            None
        };

        (iam, policy, diagnostics)
    }

    async fn fetch_aspect_refs(
        &self,
        id: &ResourceId,
        suffix: &str,
    ) -> Result<Vec<ResourceRef>> {
        let path = format!("{}{suffix}", id.path());
        let payload = self.router.get(&path, CacheMode::UseCache).await?;
        Ok(payload
            .into_items()
            .iter()
            .filter_map(resource_ref_from)
            .collect())
    }
}
