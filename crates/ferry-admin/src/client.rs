//! Admin API client implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::{AdminError, ClientConfig, Connection};

/// Header carrying the Admin API access token.
pub const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// The request-forwarding capability the migration engine consumes.
///
/// `path` is relative to the store's versioned Admin API root, e.g.
/// `products.json?limit=250` or `blogs/12/articles.json`.
#[async_trait]
pub trait AdminApi: Send + Sync {
    async fn get(&self, conn: &Connection, path: &str) -> Result<Value, AdminError>;

    async fn post(&self, conn: &Connection, path: &str, body: &Value) -> Result<Value, AdminError>;

    async fn put(&self, conn: &Connection, path: &str, body: &Value) -> Result<Value, AdminError>;

    /// Run a GraphQL document. Top-level `errors` surface as [`AdminError::GraphQl`];
    /// mutation `userErrors` are left in the returned body for the caller to check.
    async fn graphql(
        &self,
        conn: &Connection,
        query: &str,
        variables: Option<Value>,
    ) -> Result<Value, AdminError>;
}

/// reqwest-backed [`AdminApi`].
pub struct AdminClient {
    http: Client,
    config: ClientConfig,
}

impl AdminClient {
    /// Create a client with default configuration.
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout())
            .build()
            .expect("failed to build HTTP client");

        Self { http, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Full URL for a path under the versioned Admin API root.
    pub fn endpoint(&self, conn: &Connection, path: &str) -> String {
        format!(
            "{}/admin/api/{}/{}",
            conn.base_url(),
            self.config.api_version,
            path.trim_start_matches('/')
        )
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        conn: &Connection,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, AdminError> {
        conn.validate()?;
        let url = self.endpoint(conn, path);
        debug!(method = %method, url = %url, "admin request");

        let mut request = self
            .http
            .request(method, &url)
            .header(ACCESS_TOKEN_HEADER, &conn.token)
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Handle HTTP response and parse JSON.
    async fn handle_response(response: reqwest::Response) -> Result<Value, AdminError> {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<f64>().ok())
                .map(|secs| secs.ceil() as u64);
            return Err(AdminError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let body = response.text().await.map_err(|e| {
                AdminError::InvalidResponse(format!(
                    "request failed ({}): failed to read response: {}",
                    status, e
                ))
            })?;
            return Err(AdminError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

impl Default for AdminClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdminApi for AdminClient {
    async fn get(&self, conn: &Connection, path: &str) -> Result<Value, AdminError> {
        self.send_json::<Value>(reqwest::Method::GET, conn, path, None)
            .await
    }

    async fn post(&self, conn: &Connection, path: &str, body: &Value) -> Result<Value, AdminError> {
        self.send_json(reqwest::Method::POST, conn, path, Some(body))
            .await
    }

    async fn put(&self, conn: &Connection, path: &str, body: &Value) -> Result<Value, AdminError> {
        self.send_json(reqwest::Method::PUT, conn, path, Some(body))
            .await
    }

    async fn graphql(
        &self,
        conn: &Connection,
        query: &str,
        variables: Option<Value>,
    ) -> Result<Value, AdminError> {
        #[derive(Serialize)]
        struct GraphQlRequest<'a> {
            query: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            variables: Option<Value>,
        }

        let response = self
            .send_json(
                reqwest::Method::POST,
                conn,
                "graphql.json",
                Some(&GraphQlRequest { query, variables }),
            )
            .await?;

        if let Some(errors) = response.get("errors").and_then(Value::as_array)
            && !errors.is_empty()
        {
            let messages: Vec<String> = errors
                .iter()
                .map(|e| {
                    e.get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| e.to_string())
                })
                .collect();
            return Err(AdminError::GraphQl(messages.join("; ")));
        }

        Ok(response)
    }
}

#[async_trait]
impl<T: AdminApi + ?Sized> AdminApi for std::sync::Arc<T> {
    async fn get(&self, conn: &Connection, path: &str) -> Result<Value, AdminError> {
        (**self).get(conn, path).await
    }

    async fn post(&self, conn: &Connection, path: &str, body: &Value) -> Result<Value, AdminError> {
        (**self).post(conn, path, body).await
    }

    async fn put(&self, conn: &Connection, path: &str, body: &Value) -> Result<Value, AdminError> {
        (**self).put(conn, path, body).await
    }

    async fn graphql(
        &self,
        conn: &Connection,
        query: &str,
        variables: Option<Value>,
    ) -> Result<Value, AdminError> {
        (**self).graphql(conn, query, variables).await
    }
}
