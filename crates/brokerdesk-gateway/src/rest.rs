//! HTTP client for the hosted backend's REST, auth, and function endpoints.
//!
//! Rows live under `/rest/v1/<collection>` and are filtered with
//! `field=op.value` query parameters; callable functions live under
//! `/functions/v1/<name>`; the auth context under `/auth/v1`.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use tracing::{debug, warn};

use brokerdesk_core::config::GatewayConfig;
use brokerdesk_core::error::{AppError, ErrorKind};
use brokerdesk_core::result::AppResult;
use brokerdesk_core::traits::auth::{AuthProvider, UserIdentity};
use brokerdesk_core::traits::gateway::{DataGateway, Row};
use brokerdesk_core::types::filter::FilterField;
use brokerdesk_core::types::query::Query;

/// REST gateway to the hosted backend.
#[derive(Debug, Clone)]
pub struct RestGateway {
    /// Shared HTTP client.
    client: Client,
    /// Project base URL.
    base_url: Url,
    /// Public API key.
    api_key: String,
    /// Access token of the signed-in user.
    access_token: Arc<RwLock<Option<String>>>,
    /// Exposed schema.
    schema: String,
}

impl RestGateway {
    /// Create a gateway from configuration.
    pub fn new(config: &GatewayConfig) -> AppResult<Self> {
        let base_url = Url::parse(config.url.trim_end_matches('/')).map_err(|e| {
            AppError::configuration(format!("Invalid gateway url '{}': {e}", config.url))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Configuration,
                    format!("Failed to build HTTP client: {e}"),
                    e,
                )
            })?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            access_token: Arc::new(RwLock::new(config.access_token.clone())),
            schema: config.schema.clone(),
        })
    }

    /// Build the URL for a query over `collection`.
    pub fn query_url(&self, collection: &str, query: &Query) -> AppResult<Url> {
        let mut url = self.endpoint(&format!("rest/v1/{collection}"))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            for filter in &query.filters {
                pairs.append_pair(&filter.field, &filter_param(filter));
            }
            if let Some(order) = &query.order {
                pairs.append_pair("order", &order.to_param());
            }
            if let Some(page) = &query.page {
                pairs.append_pair("limit", &page.limit.to_string());
                pairs.append_pair("offset", &page.offset.to_string());
            }
        }
        Ok(url)
    }

    fn row_url(&self, collection: &str, id: &str) -> AppResult<Url> {
        self.query_url(collection, &Query::new().eq("id", id))
    }

    fn endpoint(&self, path: &str) -> AppResult<Url> {
        let base = format!("{}/{path}", self.base_url.as_str().trim_end_matches('/'));
        Url::parse(&base).map_err(|e| AppError::configuration(format!("Invalid endpoint '{base}': {e}")))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let token = self
            .access_token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .unwrap_or_else(|| self.api_key.clone());

        self.client
            .request(method, url)
            .header("apikey", self.api_key.as_str())
            .header("Accept-Profile", self.schema.as_str())
            .header("Content-Profile", self.schema.as_str())
            .bearer_auth(token)
    }

    async fn send(&self, builder: RequestBuilder) -> AppResult<Response> {
        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }

    async fn rows(&self, response: Response) -> AppResult<Vec<Row>> {
        response.json::<Vec<Row>>().await.map_err(|e| {
            AppError::with_source(ErrorKind::Decode, format!("Malformed response body: {e}"), e)
        })
    }

    async fn single(&self, response: Response, context: &str) -> AppResult<Row> {
        self.rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found(format!("{context}: backend returned no row")))
    }
}

/// Render a filter as an `op.value` query parameter value.
fn filter_param(filter: &FilterField) -> String {
    format!("{}.{}", filter.op.as_str(), filter.value)
}

/// Map a transport failure.
fn transport_error(err: reqwest::Error) -> AppError {
    let kind = if err.is_timeout() || err.is_connect() {
        ErrorKind::ServiceUnavailable
    } else {
        ErrorKind::ExternalService
    };
    AppError::with_source(kind, format!("Request failed: {err}"), err)
}

/// Map a non-success status.
pub fn status_error(status: StatusCode, body: &str) -> AppError {
    let message = format!("Backend responded {status}: {}", body.trim());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::authentication(message),
        StatusCode::NOT_FOUND => AppError::not_found(message),
        StatusCode::CONFLICT => AppError::conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => AppError::validation(message),
        s if s.is_server_error() => AppError::service_unavailable(message),
        _ => AppError::external_service(message),
    }
}

#[async_trait]
impl DataGateway for RestGateway {
    fn provider_type(&self) -> &str {
        "rest"
    }

    async fn query(&self, collection: &str, query: &Query) -> AppResult<Vec<Row>> {
        let url = self.query_url(collection, query)?;
        debug!(collection, %url, "REST query");
        let response = self.send(self.request(Method::GET, url)).await?;
        self.rows(response).await
    }

    async fn insert(&self, collection: &str, row: Row) -> AppResult<Row> {
        let url = self.endpoint(&format!("rest/v1/{collection}"))?;
        let builder = self
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(&row);
        let response = self.send(builder).await?;
        self.single(response, "insert").await
    }

    async fn update(&self, collection: &str, id: &str, patch: Row) -> AppResult<Row> {
        let url = self.row_url(collection, id)?;
        let builder = self
            .request(Method::PATCH, url)
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = self.send(builder).await?;
        self.single(response, "update").await
    }

    async fn delete(&self, collection: &str, id: &str) -> AppResult<()> {
        let url = self.row_url(collection, id)?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn upsert(&self, collection: &str, row: Row, conflict_key: &str) -> AppResult<Row> {
        let mut url = self.endpoint(&format!("rest/v1/{collection}"))?;
        url.query_pairs_mut().append_pair("on_conflict", conflict_key);
        let builder = self
            .request(Method::POST, url)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&row);
        let response = self.send(builder).await?;
        self.single(response, "upsert").await
    }

    async fn invoke(&self, function: &str, payload: Row) -> AppResult<Row> {
        let url = self.endpoint(&format!("functions/v1/{function}"))?;
        let response = self
            .send(self.request(Method::POST, url).json(&payload))
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::ExternalService,
                    format!("Function '{function}' failed: {}", e.message),
                    e,
                )
            })?;

        let text = response.text().await.map_err(transport_error)?;
        if text.trim().is_empty() {
            return Ok(Row::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(Row::String(text)))
    }
}

#[async_trait]
impl AuthProvider for RestGateway {
    async fn current_user(&self) -> AppResult<Option<UserIdentity>> {
        let has_token = self
            .access_token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some();
        if !has_token {
            return Ok(None);
        }

        let url = self.endpoint("auth/v1/user")?;
        match self.send(self.request(Method::GET, url)).await {
            Ok(response) => {
                let identity = response.json::<UserIdentity>().await.map_err(|e| {
                    AppError::with_source(ErrorKind::Decode, format!("Malformed user: {e}"), e)
                })?;
                Ok(Some(identity))
            }
            Err(e) if e.kind == ErrorKind::Authentication => {
                warn!("Access token rejected, treating session as signed out");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn sign_out(&self) -> AppResult<()> {
        let url = self.endpoint("auth/v1/logout")?;
        let result = self.send(self.request(Method::POST, url)).await;
        let mut token = self.access_token.write().unwrap_or_else(|e| e.into_inner());
        *token = None;
        result.map(|_| ())
    }
}
