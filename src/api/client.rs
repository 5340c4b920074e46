use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;

use super::{
    ApiError, ForumFields, ForumPatch, ForumPayload, ForumSource, GroupFields, GroupPatch,
    GroupPayload,
};
use crate::util::validate_base_url;

/// Upper bound on any response body. A full hierarchy is a few hundred KB at most.
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Redirect policy for API calls: at most 3 hops, never back to a URL already seen.
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        tracing::debug!(
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following API redirect"
        );
        attempt.follow()
    })
}

/// REST implementation of [`ForumSource`].
///
/// Every call is a single attempt bounded by `timeout`; retrying is left to
/// whoever issued the request.
pub struct HttpForumClient {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
    timeout: Duration,
}

impl std::fmt::Debug for HttpForumClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpForumClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpForumClient {
    /// Create a client for the server rooted at `base_url`.
    ///
    /// The base URL must be HTTPS unless it points at the local machine, so the
    /// bearer token never crosses the network in clear text.
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base_url = validate_base_url(base_url)?;
        tracing::info!(base_url = %base_url, "Configured forum API client");
        Ok(Self {
            client,
            base_url,
            token,
            timeout,
        })
    }

    /// Build a `reqwest::Client` with connection pooling suited to a single API host.
    pub fn default_http_client() -> Result<reqwest::Client, ApiError> {
        Ok(reqwest::Client::builder()
            .redirect(create_redirect_policy())
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.client.get(self.endpoint(path));
        self.send(request).await
    }

    async fn send_body<B: Serialize, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_vec(body).map_err(|e| ApiError::Encode(e.to_string()))?;
        let request = self
            .client
            .request(method, self.endpoint(path))
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        mut request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ApiError::HttpStatus(status.as_u16()));
            }
            read_limited_text(response, MAX_RESPONSE_SIZE).await
        };

        let body = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ApiError::Timeout)??;

        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ForumSource for HttpForumClient {
    async fn fetch_root_hierarchy(&self) -> Result<GroupPayload, ApiError> {
        tracing::debug!("Fetching forum hierarchy");
        self.get("forum-groups/root").await
    }

    async fn create_group(
        &self,
        parent_id: i64,
        fields: &GroupFields,
    ) -> Result<GroupPayload, ApiError> {
        tracing::debug!(parent_id, title = %fields.title, "Creating forum group");
        self.send_body(
            reqwest::Method::POST,
            &format!("forum-groups/{}/groups", parent_id),
            fields,
        )
        .await
    }

    async fn create_forum(
        &self,
        parent_id: i64,
        fields: &ForumFields,
    ) -> Result<ForumPayload, ApiError> {
        tracing::debug!(parent_id, title = %fields.title, "Creating forum");
        self.send_body(
            reqwest::Method::POST,
            &format!("forum-groups/{}/forums", parent_id),
            fields,
        )
        .await
    }

    async fn update_group(&self, id: i64, fields: &GroupFields) -> Result<GroupPatch, ApiError> {
        tracing::debug!(id, title = %fields.title, "Updating forum group");
        self.send_body(reqwest::Method::PUT, &format!("forum-groups/{}", id), fields)
            .await
    }

    async fn update_forum(&self, id: i64, fields: &ForumFields) -> Result<ForumPatch, ApiError> {
        tracing::debug!(id, title = %fields.title, "Updating forum");
        self.send_body(reqwest::Method::PUT, &format!("forums/{}", id), fields)
            .await
    }
}

/// Read a response body as text, failing once it grows past `limit` bytes.
async fn read_limited_text(response: reqwest::Response, limit: usize) -> Result<String, ApiError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    String::from_utf8(bytes).map_err(|_| ApiError::InvalidUtf8)
}
