//! In-process mock transport: a route table keyed by request path (with
//! the `api-version` parameter ignored, so fixtures don't hard-code
//! resolved versions) plus a call log for asserting network behavior.

// Each test binary compiles its own copy; not every binary uses every
// fixture helper.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};
use sw_discovery::{DiscoveryEngine, HttpMethod, RawResponse, ResourceTransport};
use sw_domain::config::DiscoveryConfig;
use sw_domain::error::Result;

pub const DEFAULT_SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";

/// Drop the `api-version` query parameter and lowercase the rest; the
/// result is the route key.
pub fn route_key(path: &str) -> String {
    let lower = path.to_ascii_lowercase();
    let Some(pos) = lower.find('?') else {
        return lower;
    };
    let (head, query) = lower.split_at(pos);
    let kept: Vec<&str> = query[1..]
        .split('&')
        .filter(|p| !p.starts_with("api-version="))
        .collect();
    if kept.is_empty() {
        head.to_string()
    } else {
        format!("{head}?{}", kept.join("&"))
    }
}

pub struct MockTransport {
    routes: Mutex<HashMap<String, (u16, Value)>>,
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        let transport = Self {
            routes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        };
        transport.route(
            &format!("/subscriptions/{DEFAULT_SUBSCRIPTION}/providers"),
            200,
            provider_catalog(),
        );
        transport
    }

    /// A transport whose provider listing is empty.
    pub fn without_providers() -> Self {
        let transport = Self::new();
        transport.route(
            &format!("/subscriptions/{DEFAULT_SUBSCRIPTION}/providers"),
            200,
            json!({"value": []}),
        );
        transport
    }

    pub fn route(&self, path: &str, status: u16, body: Value) {
        self.routes.lock().insert(route_key(path), (status, body));
    }

    /// Every path sent through the transport, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Calls whose route key equals `path`'s route key.
    pub fn calls_to(&self, path: &str) -> usize {
        let key = route_key(path);
        self.calls
            .lock()
            .iter()
            .filter(|c| route_key(c) == key)
            .count()
    }
}

#[async_trait::async_trait]
impl ResourceTransport for MockTransport {
    async fn send(&self, _method: HttpMethod, path: &str) -> Result<RawResponse> {
        self.calls.lock().push(path.to_string());
        let (status, body) = self
            .routes
            .lock()
            .get(&route_key(path))
            .cloned()
            .unwrap_or((
                404,
                json!({"error": {"code": "NotFound", "message": format!("no route for {path}")}}),
            ));
        Ok(RawResponse {
            status,
            body: serde_json::to_vec(&body).expect("serializable fixture"),
        })
    }

    fn default_subscription_id(&self) -> Option<String> {
        Some(DEFAULT_SUBSCRIPTION.to_string())
    }
}

/// The provider listing answering the registry bootstrap. Management
/// groups publish a preview as their newest version so the stable/latest
/// channels diverge.
pub fn provider_catalog() -> Value {
    json!({"value": [
        {"namespace": "Microsoft.Management", "resourceTypes": [
            {"resourceType": "managementGroups",
             "apiVersions": ["2021-04-01-preview", "2020-05-01", "2020-02-01"]},
        ]},
        {"namespace": "Microsoft.Resources", "resourceTypes": [
            {"resourceType": "subscriptions", "apiVersions": ["2021-01-01", "2020-01-01"]},
            {"resourceType": "resourceGroups", "apiVersions": ["2021-04-01"]},
            {"resourceType": "resources", "apiVersions": ["2021-04-01"]},
        ]},
        {"namespace": "Microsoft.Authorization", "resourceTypes": [
            {"resourceType": "roleDefinitions", "apiVersions": ["2022-04-01"]},
            {"resourceType": "roleAssignments", "apiVersions": ["2022-04-01"]},
            {"resourceType": "policyDefinitions", "apiVersions": ["2021-06-01"]},
            {"resourceType": "policySetDefinitions", "apiVersions": ["2021-06-01"]},
            {"resourceType": "policyAssignments", "apiVersions": ["2022-06-01"]},
        ]},
        {"namespace": "Microsoft.Network", "resourceTypes": [
            {"resourceType": "virtualNetworks", "apiVersions": ["2023-05-01"]},
        ]},
    ]})
}

pub fn engine(transport: Arc<MockTransport>) -> DiscoveryEngine {
    init_test_logging();
    DiscoveryEngine::new(transport, DiscoveryConfig::default())
}

/// Opt-in engine tracing for a test run: `SW_TEST_LOG=debug cargo test`.
pub fn init_test_logging() {
    if let Ok(filter) = std::env::var("SW_TEST_LOG") {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init();
    }
}

// ── Tenant fixture identifiers ─────────────────────────────────────

pub const ROOT_MG: &str = "/providers/Microsoft.Management/managementGroups/root";
pub const CHILD_MG: &str = "/providers/Microsoft.Management/managementGroups/platform";
pub const SUB_A: &str = "/subscriptions/00000000-0000-0000-0000-000000000001";
pub const SUB_B: &str = "/subscriptions/00000000-0000-0000-0000-000000000002";
pub const MG_SCOPE: &str = "/providers/Microsoft.Management/managementGroups";

pub fn mg_body(id: &str, name: &str, parent: Option<&str>) -> Value {
    let mut details = json!({});
    if let Some(pid) = parent {
        details = json!({"parent": {"id": pid}});
    }
    json!({
        "id": id,
        "type": "Microsoft.Management/managementGroups",
        "name": name,
        "properties": {"displayName": name, "details": details}
    })
}

pub fn descendant(id: &str, name: &str, parent_id: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "properties": {"parent": {"id": parent_id}}
    })
}

pub fn subscription_body(id: &str, display_name: &str) -> Value {
    json!({
        "id": id,
        "subscriptionId": id.rsplit('/').next().unwrap(),
        "displayName": display_name
    })
}

pub fn rg_body(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "type": "Microsoft.Resources/resourceGroups",
        "location": "westeurope"
    })
}

/// Wire a minimal tenant: root management group with one child group, one
/// subscription under the root, one under the child, and a resource group
/// in subscription A.
pub fn standard_tenant(transport: &MockTransport) {
    transport.route(ROOT_MG, 200, mg_body(ROOT_MG, "root", None));
    transport.route(CHILD_MG, 200, mg_body(CHILD_MG, "platform", Some(ROOT_MG)));
    transport.route(
        &format!("{ROOT_MG}/descendants"),
        200,
        json!({"value": [
            descendant(CHILD_MG, "platform", ROOT_MG),
            descendant(SUB_A, "sub-a", ROOT_MG),
            descendant(SUB_B, "sub-b", CHILD_MG),
        ]}),
    );
    transport.route(
        &format!("{CHILD_MG}/descendants"),
        200,
        json!({"value": [descendant(SUB_B, "sub-b", CHILD_MG)]}),
    );
    transport.route(MG_SCOPE, 200, json!({"value": [
        {"id": ROOT_MG, "name": "root"},
        {"id": CHILD_MG, "name": "platform"},
    ]}));

    transport.route(SUB_A, 200, subscription_body(SUB_A, "Sub A"));
    transport.route(SUB_B, 200, subscription_body(SUB_B, "Sub B"));

    let rg1 = format!("{SUB_A}/resourceGroups/rg1");
    transport.route(
        &format!("{SUB_A}/resourceGroups"),
        200,
        json!({"value": [rg_body(&rg1, "rg1")]}),
    );
    transport.route(&format!("{SUB_B}/resourceGroups"), 200, json!({"value": []}));
    transport.route(&rg1, 200, rg_body(&rg1, "rg1"));
    transport.route(&format!("{rg1}/resources"), 200, json!({"value": []}));
}
