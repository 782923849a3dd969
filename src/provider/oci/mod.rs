//! # OCI REST Clients
//!
//! Signed JSON-over-HTTPS transport shared by one [`ResourceClient`](crate::provider::ResourceClient)
//! implementation per OCI service.
//!
//! - `signer.rs` - API-key HTTP signatures
//! - `streaming.rs` - Streaming service streams
//! - `redis.rs` - OCI Cache clusters
//! - `functions.rs` - Functions applications
//! - `kms.rs` - Vaults and vault keys
//! - `database.rs` - Autonomous databases
//!
//! References:
//! - [OCI API request signatures](https://docs.oracle.com/en-us/iaas/Content/API/Concepts/signingrequests.htm)
//! - [OCI API pagination](https://docs.oracle.com/en-us/iaas/Content/API/Concepts/usingapi.htm#nine)

pub mod database;
pub mod functions;
pub mod kms;
pub mod redis;
pub mod signer;
pub mod streaming;

use crate::config::OciConfig;
use crate::constants::MAX_LIST_PAGES;
use crate::provider::{ProviderError, ProviderResult};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub use signer::{ApiKeySigner, RequestSigner};

const OPC_REQUEST_ID: &str = "opc-request-id";
const OPC_NEXT_PAGE: &str = "opc-next-page";
const OPC_RETRY_TOKEN: &str = "opc-retry-token";

/// Error body returned by every OCI service
#[derive(Debug, Default, Deserialize)]
struct ServiceErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// A list page: services answer with either a bare array or an `items` collection
#[derive(Deserialize)]
#[serde(untagged)]
enum Page<T> {
    Array(Vec<T>),
    Collection { items: Vec<T> },
}

impl<T> Page<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            Self::Array(items) | Self::Collection { items } => items,
        }
    }
}

/// Signed HTTP transport
pub struct OciTransport {
    http: reqwest::Client,
    signer: Arc<dyn RequestSigner>,
}

impl std::fmt::Debug for OciTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OciTransport")
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

impl OciTransport {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(signer: Arc<dyn RequestSigner>, timeout: Duration) -> ProviderResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("oci-service-operator/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, signer })
    }

    /// Transport signing with the configured API key
    ///
    /// # Errors
    ///
    /// Returns an error if the private key cannot be parsed.
    pub fn from_config(config: &OciConfig) -> ProviderResult<Self> {
        let signer = ApiKeySigner::from_pem(config.key_id(), &config.private_key_pem)?;
        Self::new(Arc::new(signer), config.request_timeout())
    }

    /// GET a single object
    pub async fn get<T: DeserializeOwned>(&self, url: &str, what: &'static str) -> ProviderResult<T> {
        let response = self.execute(self.http.get(url), None).await?;
        decode(response, what).await
    }

    /// GET every page of a list endpoint
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        what: &'static str,
    ) -> ProviderResult<Vec<T>> {
        let mut items = Vec::new();
        let mut page: Option<String> = None;
        let mut seen = HashSet::new();
        loop {
            let mut builder = self.http.get(url).query(query);
            if let Some(token) = &page {
                builder = builder.query(&[("page", token)]);
            }
            let response = self.execute(builder, None).await?;
            let next = response
                .headers()
                .get(OPC_NEXT_PAGE)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string);
            let batch: Page<T> = decode(response, what).await?;
            items.extend(batch.into_items());

            match next {
                Some(token) => {
                    check_next_page(&mut seen, &token, what)?;
                    page = Some(token);
                }
                None => break,
            }
        }
        Ok(items)
    }

    /// POST a JSON body and decode the response; creates carry an `opc-retry-token`
    pub async fn post<B, T>(&self, url: &str, body: &B, what: &'static str) -> ProviderResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let builder = self
            .http
            .post(url)
            .header(OPC_RETRY_TOKEN, uuid::Uuid::new_v4().to_string());
        let response = self.execute(builder, Some(encode(body)?)).await?;
        decode(response, what).await
    }

    /// POST a JSON body, ignoring any response body
    pub async fn post_action<B>(&self, url: &str, body: &B) -> ProviderResult<()>
    where
        B: Serialize + ?Sized + Sync,
    {
        self.execute(self.http.post(url), Some(encode(body)?)).await?;
        Ok(())
    }

    /// PUT a JSON body and decode the response
    pub async fn put<B, T>(&self, url: &str, body: &B, what: &'static str) -> ProviderResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self.execute(self.http.put(url), Some(encode(body)?)).await?;
        decode(response, what).await
    }

    /// PUT a JSON body for endpoints that answer 202 with no body
    pub async fn put_accepted<B>(&self, url: &str, body: &B) -> ProviderResult<()>
    where
        B: Serialize + ?Sized + Sync,
    {
        self.execute(self.http.put(url), Some(encode(body)?)).await?;
        Ok(())
    }

    pub async fn delete(&self, url: &str) -> ProviderResult<()> {
        self.execute(self.http.delete(url), None).await?;
        Ok(())
    }

    /// Sign, send and turn non-success statuses into [`ProviderError::Service`]
    async fn execute(&self, builder: RequestBuilder, body: Option<Vec<u8>>) -> ProviderResult<Response> {
        let builder = match body {
            Some(bytes) => builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(bytes),
            None => builder,
        };
        let mut request = builder.build()?;
        self.signer.sign(&mut request)?;

        let method: Method = request.method().clone();
        let path = request.url().path().to_string();
        let response = self.http.execute(request).await?;
        let status = response.status();
        debug!(http.method = %method, http.path = %path, http.status = status.as_u16(), "oci request");

        if status.is_success() {
            return Ok(response);
        }

        let request_id = response
            .headers()
            .get(OPC_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let text = response.text().await.unwrap_or_default();
        let body: ServiceErrorBody = serde_json::from_str(&text).unwrap_or_else(|_| ServiceErrorBody {
            code: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: text,
        });
        Err(ProviderError::Service {
            status: status.as_u16(),
            code: body.code,
            message: body.message,
            request_id,
        })
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> ProviderResult<Vec<u8>> {
    serde_json::to_vec(body).map_err(|source| ProviderError::Decode {
        what: "request body",
        source,
    })
}

async fn decode<T: DeserializeOwned>(response: Response, what: &'static str) -> ProviderResult<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|source| ProviderError::Decode { what, source })
}

/// Join a service base URL and a path
pub(crate) fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Push `(key, value)` onto a query when the value is present and non-empty
pub(crate) fn push_query(query: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        query.push((key, value.to_string()));
    }
}

/// A repeated token or too many pages means the listing would never end;
/// stopping early would hide objects and invite duplicate creates
fn check_next_page(seen: &mut HashSet<String>, token: &str, what: &'static str) -> ProviderResult<()> {
    if !seen.insert(token.to_string()) {
        return Err(ProviderError::Pagination {
            what,
            reason: format!("page token {token} repeated"),
        });
    }
    if seen.len() >= MAX_LIST_PAGES {
        return Err(ProviderError::Pagination {
            what,
            reason: format!("more than {MAX_LIST_PAGES} pages"),
        });
    }
    Ok(())
}
