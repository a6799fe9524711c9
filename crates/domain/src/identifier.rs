//! Resource identifiers and type derivation.
//!
//! Identifiers are absolute, case-insensitive path strings of the form
//! `/collection/{id}[/collection/{id}]*[/providers/{ns}/{type}/{id}]*`.
//! Original casing is preserved for display; the lowercase canonical form
//! (`key()`) is what every cache and comparison uses.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Well-known types and scopes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub const MANAGEMENT_GROUP_TYPE: &str = "Microsoft.Management/managementGroups";
pub const SUBSCRIPTION_TYPE: &str = "Microsoft.Resources/subscriptions";
pub const RESOURCE_GROUP_TYPE: &str = "Microsoft.Resources/resourceGroups";
pub const RESOURCE_TYPE: &str = "Microsoft.Resources/resources";

/// Collection scope anchoring the tenant's management-group hierarchy.
pub const MANAGEMENT_GROUP_SCOPE: &str = "/providers/Microsoft.Management/managementGroups";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ResourceId
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An absolute resource identifier. Equality and hashing are
/// case-insensitive; the stored string keeps the caller's casing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase canonical form used for cache keys.
    pub fn key(&self) -> String {
        self.0.to_ascii_lowercase()
    }

    /// The identifier without any query string.
    pub fn path(&self) -> &str {
        match self.0.find('?') {
            Some(pos) => &self.0[..pos],
            None => &self.0,
        }
    }

    /// Trailing path segment (query stripped).
    pub fn short_name(&self) -> &str {
        self.path()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("")
    }

    /// Whether `self` lies under `scope` (case-insensitive prefix test).
    pub fn is_under(&self, scope: &ResourceId) -> bool {
        let key = self.key();
        key.starts_with(&scope.key())
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl PartialEq for ResourceId {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for ResourceId {}

impl Hash for ResourceId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ResourceType
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A `{namespace}/{type}` pair identifying the schema class of a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceType(String);

impl ResourceType {
    pub fn new(t: impl Into<String>) -> Self {
        Self(t.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase canonical form used for registry keys.
    pub fn key(&self) -> String {
        self.0.to_ascii_lowercase()
    }

    /// The namespace portion (everything before the first `/`).
    pub fn namespace(&self) -> &str {
        self.0.split('/').next().unwrap_or("")
    }

    /// Case-insensitive comparison against a type literal.
    pub fn is(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }

    /// Derive the resource type from an identifier. First match wins:
    ///
    /// 1. contains `/providers/` → innermost `{namespace}/{type...}` after
    ///    the last `/providers/` (nested provider resources join their
    ///    type segments).
    /// 2. ends in `/resources` → `Microsoft.Resources/resources`.
    /// 3. ends in `/resourceGroups[/{name}]` → `Microsoft.Resources/resourceGroups`.
    /// 4. ends in `/subscriptions[/{id}]` → `Microsoft.Resources/subscriptions`.
    ///
    /// Query strings are ignored. Anything else is `UnknownResourceType`.
    pub fn derive(id: &str) -> Result<ResourceType> {
        let path = match id.find('?') {
            Some(pos) => &id[..pos],
            None => id,
        };
        let path = path.trim_end_matches('/');

        let lower = path.to_ascii_lowercase();
        if let Some(pos) = lower.rfind("/providers/") {
            let tail = &path[pos + "/providers/".len()..];
            let segments: Vec<&str> = tail.split('/').filter(|s| !s.is_empty()).collect();
            if segments.len() >= 2 {
                let namespace = segments[0];
                // Type segments sit at odd offsets; names at even ones.
                let types: Vec<&str> = segments
                    .iter()
                    .skip(1)
                    .step_by(2)
                    .copied()
                    .collect();
                return Ok(ResourceType(format!("{}/{}", namespace, types.join("/"))));
            }
            return Err(Error::UnknownResourceType(id.to_owned()));
        }

        let segments: Vec<&str> = lower.split('/').filter(|s| !s.is_empty()).collect();
        let last = segments.last().copied().unwrap_or("");
        let prev = segments
            .len()
            .checked_sub(2)
            .and_then(|i| segments.get(i))
            .copied()
            .unwrap_or("");

        if last == "resources" {
            return Ok(ResourceType::new(RESOURCE_TYPE));
        }
        if last == "resourcegroups" || prev == "resourcegroups" {
            return Ok(ResourceType::new(RESOURCE_GROUP_TYPE));
        }
        if last == "subscriptions" || prev == "subscriptions" {
            return Ok(ResourceType::new(SUBSCRIPTION_TYPE));
        }

        Err(Error::UnknownResourceType(id.to_owned()))
    }
}

impl PartialEq for ResourceType {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for ResourceType {}

impl Hash for ResourceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceType {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ResourceType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scope helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

static SUBSCRIPTION_PREFIX: OnceLock<regex::Regex> = OnceLock::new();

/// Extract the `/subscriptions/{guid}` prefix from an identifier, if any.
pub fn subscription_prefix(id: &str) -> Option<&str> {
    let re = SUBSCRIPTION_PREFIX.get_or_init(|| {
        regex::Regex::new(
            r"(?i)^/subscriptions/[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
        )
        .expect("subscription prefix pattern")
    });
    re.find(id).map(|m| m.as_str())
}

/// Drop the trailing provider suffix from an identifier, yielding the
/// governing scope. Nested provider resources lose one `{type}/{name}`
/// pair; a top-level provider resource loses the whole `/providers/...`
/// clause. Returns `None` when nothing precedes the suffix.
pub fn trim_provider_suffix(id: &str) -> Option<String> {
    let path = match id.find('?') {
        Some(pos) => &id[..pos],
        None => id,
    };
    let path = path.trim_end_matches('/');
    let lower = path.to_ascii_lowercase();
    let pos = lower.rfind("/providers/")?;

    let tail = &path[pos + "/providers/".len()..];
    let segments: Vec<&str> = tail.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() > 3 {
        // {ns}/{type}/{name}/{subtype}/{subname}... → drop the last pair.
        let keep = &segments[..segments.len() - 2];
        return Some(format!("{}/providers/{}", &path[..pos], keep.join("/")));
    }

    let scope = &path[..pos];
    if scope.is_empty() {
        None
    } else {
        Some(scope.to_owned())
    }
}
