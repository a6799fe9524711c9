//! The HTTP seam between the engine and the resource-management API.
//!
//! Everything the engine knows about the network is the [`ResourceTransport`]
//! trait: one authenticated request primitive plus the default subscription
//! of the signed-in context (needed once, for the provider-listing
//! bootstrap). [`HttpTransport`] is the production implementation; tests
//! substitute an in-memory route table.

use std::time::Duration;

use sw_domain::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// Raw response as the transport saw it. Status and body only; the engine
/// owns decoding.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Authenticated request primitive against the resource-management API.
///
/// `path` is an absolute API path including any query string (e.g.
/// `/subscriptions/x/providers?api-version=2020-06-01`). Timeouts are the
/// transport's responsibility; the engine imposes none of its own.
#[async_trait::async_trait]
pub trait ResourceTransport: Send + Sync {
    async fn send(&self, method: HttpMethod, path: &str) -> Result<RawResponse>;

    /// Default subscription of the authenticated context, used by the
    /// API-version registry bootstrap.
    fn default_subscription_id(&self) -> Option<String>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Production implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const DEFAULT_ENDPOINT: &str = "https://management.azure.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`].
fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Bearer-token transport over `reqwest`.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    default_subscription: Option<String>,
}

impl HttpTransport {
    /// Build a transport against `endpoint` with a pre-acquired bearer
    /// token. Token refresh is the caller's concern; rebuild the transport
    /// when the token rotates.
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        default_subscription: Option<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(from_reqwest)?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.into(),
            default_subscription,
        })
    }

    /// Build a transport from the environment:
    /// `SW_ACCESS_TOKEN` (required), `SW_SUBSCRIPTION_ID`,
    /// `SW_ENDPOINT` (defaults to the public cloud endpoint).
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("SW_ACCESS_TOKEN")
            .map_err(|_| Error::Config("environment variable 'SW_ACCESS_TOKEN' not set".into()))?;
        let endpoint =
            std::env::var("SW_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let default_subscription = std::env::var("SW_SUBSCRIPTION_ID").ok();
        Self::new(endpoint, token, default_subscription)
    }
}

#[async_trait::async_trait]
impl ResourceTransport for HttpTransport {
    async fn send(&self, method: HttpMethod, path: &str) -> Result<RawResponse> {
        let url = format!("{}{}", self.endpoint, path);
        let builder = match method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        };
        let response = builder
            .bearer_auth(&self.token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(from_reqwest)?.to_vec();
        tracing::debug!(%url, status, bytes = body.len(), "transport response");
        Ok(RawResponse { status, body })
    }

    fn default_subscription_id(&self) -> Option<String> {
        self.default_subscription.clone()
    }
}
