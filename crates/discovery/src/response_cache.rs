//! The deduplication layer closest to the network: a concurrent map from
//! fully-qualified request URI (query string included, lowercased) to the
//! decoded response it produced.

use dashmap::DashMap;
use serde_json::Value;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Payload
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A decoded response body, collapsed so list endpoints and singleton
/// endpoints share one interface.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    One(Value),
    Many(Vec<Value>),
}

impl Payload {
    /// Collapse rule: an object whose single property is `value` holding
    /// an array becomes `Many`; anything else stays `One`.
    pub fn from_value(value: Value) -> Payload {
        if let Value::Object(map) = &value {
            if map.len() == 1 {
                if let Some(Value::Array(items)) = map.get("value") {
                    return Payload::Many(items.clone());
                }
            }
        }
        Payload::One(value)
    }

    pub fn is_many(&self) -> bool {
        matches!(self, Payload::Many(_))
    }

    /// The payload as a uniform item list (a singleton yields one item).
    pub fn into_items(self) -> Vec<Value> {
        match self {
            Payload::One(v) => vec![v],
            Payload::Many(items) => items,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RawResponseCache
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One cached response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub payload: Payload,
}

/// Thread-safe URI → response mapping. Only successful decodes are
/// installed; errors must stay uncached so a later call retries.
#[derive(Default)]
pub struct RawResponseCache {
    entries: DashMap<String, CachedResponse>,
}

impl RawResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `uri` is expected in canonical (lowercase) form.
    pub fn get(&self, uri: &str) -> Option<CachedResponse> {
        self.entries.get(uri).map(|e| e.value().clone())
    }

    pub fn insert(&self, uri: String, response: CachedResponse) {
        self.entries.insert(uri, response);
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.entries.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collapse_single_value_property() {
        let payload = Payload::from_value(json!({"value": [{"id": "a"}, {"id": "b"}]}));
        assert_eq!(
            payload,
            Payload::Many(vec![json!({"id": "a"}), json!({"id": "b"})])
        );
    }

    #[test]
    fn no_collapse_with_extra_properties() {
        // Paged listings carry `nextLink`; they stay single objects.
        let body = json!({"value": [], "nextLink": "https://example.test/next"});
        let payload = Payload::from_value(body.clone());
        assert_eq!(payload, Payload::One(body));
    }

    #[test]
    fn no_collapse_when_value_is_not_an_array() {
        let body = json!({"value": {"id": "a"}});
        assert_eq!(Payload::from_value(body.clone()), Payload::One(body));
    }

    #[test]
    fn items_view_is_uniform() {
        assert_eq!(Payload::from_value(json!({"id": "a"})).into_items().len(), 1);
        assert_eq!(
            Payload::from_value(json!({"value": [1, 2, 3]})).into_items().len(),
            3
        );
    }

    #[test]
    fn cache_round_trip() {
        let cache = RawResponseCache::new();
        let uri = "/subscriptions/a?api-version=2021-01-01".to_string();
        cache.insert(
            uri.clone(),
            CachedResponse {
                status: 200,
                payload: Payload::One(json!({"id": "a"})),
            },
        );
        assert!(cache.contains(&uri));
        assert_eq!(cache.len(), 1);
        let hit = cache.get(&uri).unwrap();
        assert_eq!(hit.status, 200);
        cache.clear();
        assert!(cache.is_empty());
    }
}
