//! End-to-end build scenarios against the mock transport: cache hits and
//! bypasses, parent resolution, hint-map short-circuits, and in-place
//! aspect upgrades.

mod common;

use std::sync::Arc;

use common::*;
use serde_json::json;
use sw_domain::config::{CacheMode, DiscoveryMode};
use sw_domain::error::Error;
use sw_domain::identifier::ResourceId;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Root management group, then a zero-call cache hit
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn root_management_group_builds_as_hierarchy_root() {
    let transport = Arc::new(MockTransport::new());
    standard_tenant(&transport);
    let engine = engine(transport.clone());

    let node = engine
        .build(ROOT_MG, CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap();

    assert!(node.resource_type.is("Microsoft.Management/managementGroups"));
    assert_eq!(node.provider, "Microsoft.Management");
    assert_eq!(node.name, "root");
    assert!(node.parent.is_none());
    assert!(node.parents.is_empty());
    assert_eq!(node.parent_path, "");
    assert_eq!(node.resource_path, "/root");
    assert_eq!(node.aspects, DiscoveryMode::ExcludeBoth);
}

#[tokio::test]
async fn second_build_serves_from_cache_without_transport_calls() {
    let transport = Arc::new(MockTransport::new());
    standard_tenant(&transport);
    let engine = engine(transport.clone());

    let first = engine
        .build(ROOT_MG, CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap();
    let calls_after_first = transport.call_count();
    let cache_size_after_first = engine.state_cache().len();

    let second = engine
        .build(ROOT_MG, CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap();

    assert_eq!(transport.call_count(), calls_after_first);
    assert_eq!(engine.state_cache().len(), cache_size_after_first);
    assert!(Arc::ptr_eq(&first, &second));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Resource-group parentage from the identifier prefix
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn resource_group_parent_is_its_subscription() {
    let transport = Arc::new(MockTransport::new());
    standard_tenant(&transport);
    // No hints recorded, so the subscription's own parent resolves via
    // the management-group scan baked into the standard tenant.
    let engine = engine(transport.clone());

    let rg1 = format!("{SUB_A}/resourceGroups/rg1");
    let node = engine
        .build(rg1.as_str(), CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap();

    let parent = node.parent.as_ref().unwrap();
    assert_eq!(parent.id, ResourceId::from(SUB_A));
    assert!(parent.resource_type.is("Microsoft.Resources/subscriptions"));
    // The scan discovers sub-a's own parent too, so the chain continues
    // up to the root group.
    assert_eq!(node.parents.len(), 2);
    assert_eq!(node.parents[0].id, ResourceId::from(ROOT_MG));
    assert_eq!(node.parents[1].id, ResourceId::from(SUB_A));
    assert_eq!(node.resource_path, format!("/root/{}/rg1", SUB_A.rsplit('/').next().unwrap()));
}

#[tokio::test]
async fn resource_group_parent_chain_stops_without_hierarchy_visibility() {
    let transport = Arc::new(MockTransport::new());
    let engine = engine(transport.clone());

    let sub = "/subscriptions/00000000-0000-0000-0000-000000000001";
    let rg = format!("{sub}/resourceGroups/rg1");
    transport.route(&rg, 200, rg_body(&rg, "rg1"));
    transport.route(&format!("{rg}/resources"), 200, json!({"value": []}));
    // Empty management-group scope: the subscription's parent stays null.
    transport.route(MG_SCOPE, 200, json!({"value": []}));

    let node = engine
        .build(rg.as_str(), CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap();

    assert_eq!(node.parent.as_ref().unwrap().id, ResourceId::from(sub));
    assert_eq!(node.parents.len(), 1);
    assert_eq!(node.parents[0].id, ResourceId::from(sub));
    assert_eq!(node.parent_path, "/00000000-0000-0000-0000-000000000001");
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Descendants listings prime the parent hint map
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn hint_map_short_circuits_the_management_group_scan() {
    let transport = Arc::new(MockTransport::new());
    standard_tenant(&transport);
    let engine = engine(transport.clone());

    // Building the root walks its descendants, recording parent edges.
    engine
        .build(ROOT_MG, CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap();
    assert!(engine.parent_hints().len() >= 2);

    let node = engine
        .build(SUB_A, CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap();

    assert_eq!(node.parent.as_ref().unwrap().id, ResourceId::from(ROOT_MG));
    assert_eq!(node.name, "Sub A");
    // The expensive fallback never ran.
    assert_eq!(transport.calls_to(MG_SCOPE), 0);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Aspect upgrades re-query aspects only
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn aspect_upgrade_skips_the_primary_record() {
    let transport = Arc::new(MockTransport::new());
    standard_tenant(&transport);
    for suffix in [
        "roleDefinitions",
        "roleAssignments?$filter=atScope()",
        "policyDefinitions",
        "policySetDefinitions",
        "policyAssignments?$filter=atScope()",
    ] {
        transport.route(
            &format!("{ROOT_MG}/providers/Microsoft.Authorization/{suffix}"),
            200,
            json!({"value": []}),
        );
    }
    let engine = engine(transport.clone());

    engine
        .build(ROOT_MG, CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap();
    let primary_calls_before = transport.calls_to(ROOT_MG);
    let total_before = transport.call_count();

    let upgraded = engine
        .build(ROOT_MG, CacheMode::UseCache, DiscoveryMode::IncludeBoth)
        .await
        .unwrap();

    // Five aspect sub-queries, nothing else.
    assert_eq!(transport.calls_to(ROOT_MG), primary_calls_before);
    assert_eq!(transport.call_count(), total_before + 5);
    assert_eq!(upgraded.aspects, DiscoveryMode::IncludeBoth);

    // The cache now serves the upgraded snapshot.
    let cached = engine
        .build(ROOT_MG, CacheMode::UseCache, DiscoveryMode::IncludeBoth)
        .await
        .unwrap();
    assert_eq!(transport.call_count(), total_before + 5);
    assert_eq!(cached.aspects, DiscoveryMode::IncludeBoth);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cache bypass and immutability
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn skip_cache_refetches_primary_but_never_writes_the_state_cache() {
    let transport = Arc::new(MockTransport::new());
    standard_tenant(&transport);
    let engine = engine(transport.clone());

    let cached = engine
        .build(ROOT_MG, CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap();
    let primary_before = transport.calls_to(ROOT_MG);

    let fresh = engine
        .build(ROOT_MG, CacheMode::SkipCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap();

    // Exactly one more primary fetch; subordinate calls were cache hits.
    assert_eq!(transport.calls_to(ROOT_MG), primary_before + 1);
    assert_eq!(fresh.id, cached.id);
    // The bypassing build did not replace the published node.
    let republished = engine
        .build(ROOT_MG, CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap();
    assert!(Arc::ptr_eq(&cached, &republished));
}

#[tokio::test]
async fn cached_node_is_immutable_across_reads() {
    let transport = Arc::new(MockTransport::new());
    standard_tenant(&transport);
    let engine = engine(transport.clone());

    let node = engine
        .build(ROOT_MG, CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap();
    let snapshot = serde_json::to_string(&*node).unwrap();

    // Unrelated work must not disturb the published node.
    engine
        .build(SUB_A, CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap();
    engine
        .build(ROOT_MG, CacheMode::SkipCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap();

    let reread = engine
        .build(ROOT_MG, CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap();
    assert_eq!(serde_json::to_string(&*reread).unwrap(), snapshot);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Children partition (management groups)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn descendants_partition_into_children_and_linked() {
    let transport = Arc::new(MockTransport::new());
    standard_tenant(&transport);
    let engine = engine(transport.clone());

    let node = engine
        .build(ROOT_MG, CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap();

    // Direct children: the child group and sub-a. Linked: sub-b, whose
    // parent is the child group.
    let child_ids: Vec<String> = node.children.iter().map(|c| c.id.key()).collect();
    let linked_ids: Vec<String> = node.linked_resources.iter().map(|c| c.id.key()).collect();
    assert_eq!(node.children.len() + node.linked_resources.len(), 3);
    assert!(child_ids.contains(&CHILD_MG.to_ascii_lowercase()));
    assert!(child_ids.contains(&SUB_A.to_ascii_lowercase()));
    assert_eq!(linked_ids, vec![SUB_B.to_ascii_lowercase()]);
    assert!(child_ids.iter().all(|id| !linked_ids.contains(id)));
}

#[tokio::test]
async fn parent_chains_are_monotonic_down_the_tree() {
    let transport = Arc::new(MockTransport::new());
    standard_tenant(&transport);
    let engine = engine(transport.clone());

    engine
        .build(ROOT_MG, CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap();
    let child_mg = engine
        .build(CHILD_MG, CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap();
    let sub_b = engine
        .build(SUB_B, CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap();

    assert_eq!(child_mg.parents.len(), 1);
    assert_eq!(child_mg.parents[0].id, ResourceId::from(ROOT_MG));

    // Every ancestor of the child group prefixes sub-b's chain.
    assert_eq!(sub_b.parents.len(), 2);
    assert_eq!(sub_b.parents[0].id, ResourceId::from(ROOT_MG));
    assert_eq!(sub_b.parents[1].id, ResourceId::from(CHILD_MG));
    assert_eq!(sub_b.depth(), 2);
    assert_eq!(sub_b.parent_path, "/root/platform");
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Failure modes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn collection_identifier_is_ambiguous_for_a_single_build() {
    let transport = Arc::new(MockTransport::new());
    standard_tenant(&transport);
    let engine = engine(transport.clone());

    let err = engine
        .build(
            format!("{SUB_A}/resourceGroups").as_str(),
            CacheMode::UseCache,
            DiscoveryMode::ExcludeBoth,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AmbiguousIdentifier(_)));
    // Failed builds never install cache entries.
    assert_eq!(engine.state_cache().len(), 0);
}

#[tokio::test]
async fn empty_provider_listing_is_fatal_at_first_use() {
    let transport = Arc::new(MockTransport::without_providers());
    let engine = engine(transport.clone());

    let err = engine
        .build(ROOT_MG, CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProviderDiscoveryFailed));
}

#[tokio::test]
async fn primary_api_failure_is_fatal_and_uncached() {
    let transport = Arc::new(MockTransport::new());
    let engine = engine(transport.clone());
    transport.route(
        SUB_A,
        403,
        json!({"error": {"code": "AuthorizationFailed", "message": "denied"}}),
    );

    let err = engine
        .build(SUB_A, CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap_err();
    match err {
        Error::ApiCallFailed { status, code, .. } => {
            assert_eq!(status, 403);
            assert_eq!(code, "AuthorizationFailed");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(engine.state_cache().is_empty());
    // A later call retries the fetch instead of serving a cached error.
    let _ = engine
        .build(SUB_A, CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap_err();
    assert_eq!(transport.calls_to(SUB_A), 2);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Release channels and cache generations
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn release_channel_selects_the_composed_api_version() {
    use sw_domain::config::{DiscoveryConfig, Release};

    let transport = Arc::new(MockTransport::new());
    standard_tenant(&transport);
    let latest_engine = sw_discovery::DiscoveryEngine::new(
        transport.clone(),
        DiscoveryConfig {
            release: Release::Latest,
            ..Default::default()
        },
    );

    latest_engine
        .build(ROOT_MG, CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap();
    let primary_call = transport
        .calls()
        .into_iter()
        .find(|c| route_key(c) == route_key(ROOT_MG))
        .unwrap();
    assert!(primary_call.contains("api-version=2021-04-01-preview"));

    // Stable channel on a fresh engine picks the newest GA date.
    let stable_engine = engine(transport.clone());
    assert_eq!(stable_engine.config().release, Release::Stable);
    stable_engine
        .build(ROOT_MG, CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap();
    let stable_call = transport
        .calls()
        .into_iter()
        .rev()
        .find(|c| route_key(c) == route_key(ROOT_MG))
        .unwrap();
    assert!(stable_call.contains("api-version=2020-05-01"));
}

#[tokio::test]
async fn reset_starts_a_fresh_generation() {
    let transport = Arc::new(MockTransport::new());
    standard_tenant(&transport);
    let engine = engine(transport.clone());

    engine
        .build(ROOT_MG, CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap();
    assert!(!engine.state_cache().is_empty());
    assert!(!engine.response_cache().is_empty());

    engine.reset_caches();
    assert!(engine.state_cache().is_empty());
    assert!(engine.response_cache().is_empty());
    assert!(engine.parent_hints().is_empty());
    assert!(engine.version_registry().is_empty());

    // Rebuilding works and re-bootstraps the registry.
    let node = engine
        .build(ROOT_MG, CacheMode::UseCache, DiscoveryMode::ExcludeBoth)
        .await
        .unwrap();
    assert_eq!(node.resource_path, "/root");
}
