//! Catalog API HTTP client (reqwest-based).

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    BulkUpdatePayload, CatalogEntry, CatalogResource, CatalogType, CreateEntryPayload,
    CreateTypePayload, EntryResponse, ListEntriesResponse, ListResourcesResponse,
    ListTypesResponse, PartialEntryPayload, TypeResponse, UpdateSchemaPayload, UpdateTypePayload,
};
use crate::retry::{parse_retry_after, RetryPolicy};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for [`CatalogClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API, e.g. `https://api.example.com`.
    pub endpoint: String,
    pub api_key: String,
    pub user_agent: String,
    /// Reject every request other than `GET` before sending it.
    pub read_only: bool,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl ClientConfig {
    #[must_use]
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            user_agent: format!("catalog-importer/{}", env!("CARGO_PKG_VERSION")),
            read_only: false,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Client for the catalog API.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    /// Base URL without a trailing slash.
    base_url: String,
    api_key: String,
    http_client: Client,
    read_only: bool,
    retry: RetryPolicy,
}

impl CatalogClient {
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let base_url = config.endpoint.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| ApiError::InvalidEndpoint(format!("{}: {e}", config.endpoint)))?;

        let http_client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()?;

        Ok(Self {
            base_url,
            api_key: config.api_key,
            http_client,
            read_only: config.read_only,
            retry: config.retry,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    // ── Catalog types ─────────────────────────────────────────────────

    pub async fn list_types(&self) -> ApiResult<Vec<CatalogType>> {
        let response: ListTypesResponse = self
            .request_json(Method::GET, "/v3/catalog_types", &[], None::<&()>)
            .await?;
        Ok(response.catalog_types)
    }

    /// Every type usable as an attribute type.
    pub async fn list_resources(&self) -> ApiResult<Vec<CatalogResource>> {
        let response: ListResourcesResponse = self
            .request_json(Method::GET, "/v3/catalog_resources", &[], None::<&()>)
            .await?;
        Ok(response.resources)
    }

    pub async fn create_type(&self, payload: &CreateTypePayload) -> ApiResult<CatalogType> {
        let response: TypeResponse = self
            .request_json(Method::POST, "/v3/catalog_types", &[], Some(payload))
            .await?;
        Ok(response.catalog_type)
    }

    pub async fn update_type(
        &self,
        id: &str,
        payload: &UpdateTypePayload,
    ) -> ApiResult<CatalogType> {
        let path = format!("/v3/catalog_types/{id}");
        let response: TypeResponse = self
            .request_json(Method::PUT, &path, &[], Some(payload))
            .await?;
        Ok(response.catalog_type)
    }

    pub async fn update_type_schema(
        &self,
        id: &str,
        payload: &UpdateSchemaPayload,
    ) -> ApiResult<CatalogType> {
        let path = format!("/v3/catalog_types/{id}/actions/update_schema");
        let response: TypeResponse = self
            .request_json(Method::PUT, &path, &[], Some(payload))
            .await?;
        Ok(response.catalog_type)
    }

    pub async fn delete_type(&self, id: &str) -> ApiResult<()> {
        let path = format!("/v3/catalog_types/{id}");
        self.request(Method::DELETE, &path, &[], None::<&()>)
            .await
            .map(|_| ())
    }

    // ── Catalog entries ───────────────────────────────────────────────

    /// One page of entries for a type, after the entry with id `after`.
    pub async fn list_entries_page(
        &self,
        catalog_type_id: &str,
        page_size: usize,
        after: Option<&str>,
    ) -> ApiResult<Vec<CatalogEntry>> {
        let mut query = vec![
            ("catalog_type_id", catalog_type_id.to_string()),
            ("page_size", page_size.to_string()),
        ];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let response: ListEntriesResponse = self
            .request_json(Method::GET, "/v3/catalog_entries", &query, None::<&()>)
            .await?;
        debug!(
            catalog_type_id,
            count = response.catalog_entries.len(),
            next = ?response.pagination_meta.after,
            "Listed catalog entries"
        );
        Ok(response.catalog_entries)
    }

    pub(crate) async fn create_entry(
        &self,
        payload: &CreateEntryPayload,
    ) -> ApiResult<CatalogEntry> {
        let response: EntryResponse = self
            .request_json(Method::POST, "/v3/catalog_entries", &[], Some(payload))
            .await?;
        Ok(response.catalog_entry)
    }

    pub async fn delete_entry(&self, id: &str) -> ApiResult<()> {
        let path = format!("/v3/catalog_entries/{id}");
        self.request(Method::DELETE, &path, &[], None::<&()>)
            .await
            .map(|_| ())
    }

    pub(crate) async fn bulk_update_entries(
        &self,
        catalog_type_id: &str,
        entries: Vec<PartialEntryPayload>,
        update_attributes: &[String],
    ) -> ApiResult<()> {
        let payload = BulkUpdatePayload {
            catalog_type_id: catalog_type_id.to_string(),
            entries,
            update_attributes: update_attributes.to_vec(),
        };
        self.request(
            Method::POST,
            "/v3/catalog_entries/actions/bulk_update",
            &[],
            Some(&payload),
        )
        .await
        .map(|_| ())
    }

    // ── Transport ─────────────────────────────────────────────────────

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&impl Serialize>,
    ) -> ApiResult<T> {
        let text = self.request(method.clone(), path, query, body).await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(format!("{method} {path}: {e}")))
    }

    /// Send a request with retries and return the response body.
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&impl Serialize>,
    ) -> ApiResult<String> {
        let url = format!("{}{path}", self.base_url);
        if self.read_only && method != Method::GET {
            return Err(ApiError::ReadOnly {
                method: method.to_string(),
                url,
            });
        }

        let body = body
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| ApiError::Decode(format!("encoding request body: {e}")))?;
        let operation = format!("{method} {path}");

        self.retry
            .execute(&operation, || {
                self.send_once(method.clone(), &url, query, body.as_ref())
            })
            .await
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> ApiResult<String> {
        let mut builder = self
            .http_client
            .request(method, url)
            .bearer_auth(&self.api_key);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.text().await?);
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| parse_retry_after(v, Utc::now()));
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());

        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                warn!(url, retry_after = ?retry_after, "Catalog API rate limited");
                Err(ApiError::RateLimited { retry_after })
            }
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(if body.is_empty() {
                url.to_string()
            } else {
                body
            })),
            status if status.is_server_error() => Err(ApiError::Server {
                status: status.as_u16(),
                body,
            }),
            status => Err(ApiError::Api {
                status: status.as_u16(),
                body: if body.is_empty() {
                    "no response body".to_string()
                } else {
                    body
                },
            }),
        }
    }
}
