//! Resolves `providerNamespace/resourceType` to an API version string.
//!
//! The registry is empty until first use; the first `resolve` issues one
//! bulk provider listing against the authenticated context's default
//! subscription and records, per resource type, the newest published
//! version (`latest`) and the newest GA version (`stable`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use serde_json::Value;
use sw_domain::config::Release;
use sw_domain::error::{Error, Result};
use sw_domain::identifier::ResourceType;

use crate::response_cache::Payload;
use crate::transport::{HttpMethod, ResourceTransport};

/// Version pinned for the bootstrap listing itself, which cannot be
/// resolved dynamically.
pub const BOOTSTRAP_API_VERSION: &str = "2020-06-01";

static STABLE_VERSION: OnceLock<regex::Regex> = OnceLock::new();

/// GA versions are bare dates; previews and betas carry a suffix.
fn is_stable(version: &str) -> bool {
    let re = STABLE_VERSION
        .get_or_init(|| regex::Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("stable version pattern"));
    re.is_match(version)
}

pub struct ApiVersionRegistry {
    transport: Arc<dyn ResourceTransport>,
    /// `"{namespace}/{type} ({release})"` lowercase → version string.
    versions: DashMap<String, String>,
    loaded: AtomicBool,
    /// Serializes the bootstrap listing only; resolved reads never touch it.
    bootstrap: tokio::sync::Mutex<()>,
}

impl ApiVersionRegistry {
    pub fn new(transport: Arc<dyn ResourceTransport>) -> Self {
        Self {
            transport,
            versions: DashMap::new(),
            loaded: AtomicBool::new(false),
            bootstrap: tokio::sync::Mutex::new(()),
        }
    }

    /// Resolve the API version for `resource_type` on the given release
    /// channel, bootstrapping the registry on first use.
    ///
    /// Nested types not published on their own (`ns/a/b`, action paths
    /// like `.../descendants`) fall back to their base type's version.
    pub async fn resolve(&self, resource_type: &ResourceType, release: Release) -> Result<String> {
        self.ensure_loaded().await?;
        let mut lookup = resource_type.key();
        loop {
            let key = Self::key(&ResourceType::new(lookup.clone()), release);
            if let Some(version) = self.versions.get(&key) {
                return Ok(version.value().clone());
            }
            match lookup.rfind('/') {
                // Trim trailing type segments down to `{namespace}/{type}`.
                Some(pos) if lookup[..pos].contains('/') => lookup.truncate(pos),
                _ => return Err(Error::UnknownApiVersion(resource_type.to_string())),
            }
        }
    }

    /// Number of registered `(type, release)` entries.
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Drop everything; the next `resolve` re-issues the listing.
    pub fn reset(&self) {
        self.versions.clear();
        self.loaded.store(false, Ordering::Release);
    }

    fn key(resource_type: &ResourceType, release: Release) -> String {
        let channel = match release {
            Release::Stable => "stable",
            Release::Latest => "latest",
        };
        format!("{} ({})", resource_type.key(), channel)
    }

    async fn ensure_loaded(&self) -> Result<()> {
        if self.loaded.load(Ordering::Acquire) {
            return Ok(());
        }
        let _guard = self.bootstrap.lock().await;
        if self.loaded.load(Ordering::Acquire) {
            return Ok(());
        }

        let subscription = self.transport.default_subscription_id().ok_or_else(|| {
            Error::Config("transport has no default subscription for provider discovery".into())
        })?;
        let path = format!(
            "/subscriptions/{subscription}/providers?api-version={BOOTSTRAP_API_VERSION}"
        );
        let response = self.transport.send(HttpMethod::Get, &path).await?;
        if response.status != 200 {
            return Err(Error::ApiCallFailed {
                status: response.status,
                code: "ProviderListingFailed".into(),
                message: "provider listing returned a non-200 status".into(),
            });
        }

        let body: Value = serde_json::from_slice(&response.body)?;
        let providers = match Payload::from_value(body) {
            Payload::Many(items) => items,
            Payload::One(_) => Vec::new(),
        };

        let mut registered = 0usize;
        for provider in &providers {
            let Some(namespace) = provider.get("namespace").and_then(Value::as_str) else {
                continue;
            };
            let Some(types) = provider.get("resourceTypes").and_then(Value::as_array) else {
                continue;
            };
            for entry in types {
                let Some(type_name) = entry.get("resourceType").and_then(Value::as_str) else {
                    continue;
                };
                let versions: Vec<&str> = entry
                    .get("apiVersions")
                    .and_then(Value::as_array)
                    .map(|vs| vs.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default();
                let Some(latest) = versions.iter().max().copied() else {
                    continue;
                };
                // The API publishes versions in sortable form; lexicographic
                // max is the newest. Preview-only types fall back to latest
                // on the stable channel.
                let stable = versions
                    .iter()
                    .filter(|v| is_stable(v))
                    .max()
                    .copied()
                    .unwrap_or(latest);

                let full = ResourceType::new(format!("{namespace}/{type_name}"));
                self.versions
                    .insert(Self::key(&full, Release::Latest), latest.to_string());
                self.versions
                    .insert(Self::key(&full, Release::Stable), stable.to_string());
                registered += 1;
            }
        }

        if registered == 0 {
            return Err(Error::ProviderDiscoveryFailed);
        }

        self.loaded.store(true, Ordering::Release);
        tracing::info!(resource_types = registered, "API version registry populated");
        Ok(())
    }
}
