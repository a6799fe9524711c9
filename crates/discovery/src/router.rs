//! Converts a resource identifier into the correct request URI and performs
//! the request, consulting and populating the raw-response cache.

use std::sync::Arc;

use serde_json::Value;
use sw_domain::config::{CacheMode, Release};
use sw_domain::error::{Error, Result};
use sw_domain::identifier::ResourceType;

use crate::api_versions::ApiVersionRegistry;
use crate::response_cache::{CachedResponse, Payload, RawResponseCache};
use crate::transport::{HttpMethod, ResourceTransport};

/// Issues `GET`s for resource identifiers: infers the type, attaches the
/// resolved API version, normalizes the query string, and caches decoded
/// bodies by full URI.
#[derive(Clone)]
pub struct RequestRouter {
    transport: Arc<dyn ResourceTransport>,
    versions: Arc<ApiVersionRegistry>,
    responses: Arc<RawResponseCache>,
    release: Release,
}

impl RequestRouter {
    pub fn new(
        transport: Arc<dyn ResourceTransport>,
        versions: Arc<ApiVersionRegistry>,
        responses: Arc<RawResponseCache>,
        release: Release,
    ) -> Self {
        Self {
            transport,
            versions,
            responses,
            release,
        }
    }

    /// Fetch the payload behind `path` (an identifier, optionally carrying
    /// its own query parameters such as `$filter=atScope()`).
    ///
    /// `UseCache` serves hits without touching the transport. `SkipCache`
    /// always dispatches but still writes the fresh result back, so later
    /// `UseCache` calls benefit. Errors are never cached.
    pub async fn get(&self, path: &str, cache_mode: CacheMode) -> Result<Payload> {
        let uri = self.compose(path).await?;
        let key = uri.to_ascii_lowercase();

        if cache_mode == CacheMode::UseCache {
            if let Some(hit) = self.responses.get(&key) {
                tracing::debug!(uri = %key, "response cache hit");
                return Ok(hit.payload);
            }
        }

        let response = self.transport.send(HttpMethod::Get, &uri).await?;
        if response.status != 200 {
            return Err(decode_error(response.status, &response.body));
        }

        let body: Value = serde_json::from_slice(&response.body)?;
        let payload = Payload::from_value(body);
        self.responses.insert(
            key,
            CachedResponse {
                status: response.status,
                payload: payload.clone(),
            },
        );
        Ok(payload)
    }

    /// Compose the request URI for an identifier: `{path}?api-version={v}`
    /// with the version resolved for the identifier's type, then query
    /// separators normalized (first `?` kept, subsequent `?` → `&`).
    pub async fn compose(&self, path: &str) -> Result<String> {
        let resource_type = ResourceType::derive(path)?;
        let version = self.versions.resolve(&resource_type, self.release).await?;
        Ok(normalize_query(format!("{path}?api-version={version}")))
    }
}

/// Keep the first `?`, rewrite every later one to `&`.
fn normalize_query(uri: String) -> String {
    let Some(first) = uri.find('?') else {
        return uri;
    };
    let (head, tail) = uri.split_at(first + 1);
    if !tail.contains('?') {
        return uri;
    }
    format!("{head}{}", tail.replace('?', "&"))
}

/// Decode a non-200 body as `{error: {code, message}}`, falling back to a
/// stub for bodies that don't parse.
fn decode_error(status: u16, body: &[u8]) -> Error {
    let parsed: Option<Value> = serde_json::from_slice(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|v| v.pointer("/error/code"))
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string();
    let message = parsed
        .as_ref()
        .and_then(|v| v.pointer("/error/message"))
        .and_then(Value::as_str)
        .unwrap_or("request failed")
        .to_string();
    Error::ApiCallFailed {
        status,
        code,
        message,
    }
}
