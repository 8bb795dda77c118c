//! REST adapter.
//!
//! Issues JSON requests against the configured base URL, attaches the
//! bearer token, and maps failures onto [`ApiError`]. There is no retry;
//! callers decide what to do with an error.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::token::TokenStore;

/// Longest body excerpt written to logs.
const LOG_BODY_LIMIT: usize = 500;

/// Whether a request carries the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Token must be present; fails with `Unauthenticated` otherwise.
    Required,
    /// Token is attached when present.
    IfPresent,
    /// Token is never attached (e.g. the login call itself).
    Anonymous,
}

/// Query-string pairs appended to a request URL.
pub type QueryParams = Vec<(String, String)>;

/// HTTP client for the storefront backend.
///
/// Cheap to clone; clones share the connection pool and token store.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
}

impl ApiClient {
    /// Create a client for `config.api_url`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, tokens: TokenStore) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_url.as_str().trim_end_matches('/').to_string(),
                tokens,
            }),
        })
    }

    /// Token store used for bearer headers.
    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    /// Build the absolute URL for `path` with `query` appended.
    fn url(&self, path: &str, query: &[(String, String)]) -> Result<Url, ApiError> {
        let path = path.trim_start_matches('/');
        let mut url = Url::parse(&format!("{}/{path}", self.inner.base_url))
            .map_err(|e| ApiError::Network(format!("invalid request URL for {path}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Send a request and decode the JSON response body.
    ///
    /// Any 2xx response is decoded as `T`; an empty body decodes as JSON
    /// `null`.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` if `auth` is `Required` and no token is stored
    /// - `Network` on transport failure
    /// - `Http` on a non-2xx response
    /// - `Decode` if the body does not match `T`
    #[instrument(skip(self, query, body), fields(method = %method, path = %path))]
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&serde_json::Value>,
        auth: AuthMode,
    ) -> Result<T, ApiError> {
        let token = match auth {
            AuthMode::Anonymous => None,
            AuthMode::IfPresent => self.inner.tokens.get()?,
            AuthMode::Required => Some(self.inner.tokens.get()?.ok_or(ApiError::Unauthenticated)?),
        };

        let url = self.url(path, query)?;
        let mut request = self
            .inner
            .client
            .request(method, url)
            .header("Accept", "application/json");
        if let Some(token) = &token {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "Request failed before a response was received");
            ApiError::Network(e.to_string())
        })?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await.map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = error_message(status, &response_text);
            if status.is_server_error() {
                error!(
                    status = %status,
                    body = %excerpt(&response_text),
                    "Backend returned server error"
                );
            } else {
                warn!(status = %status, message = %message, "Backend rejected request");
            }
            return Err(ApiError::Http { status, message });
        }

        debug!(status = %status, bytes = response_text.len(), "Response received");

        let raw = if response_text.trim().is_empty() {
            "null"
        } else {
            response_text.as_str()
        };
        serde_json::from_str(raw).map_err(|e| {
            error!(
                error = %e,
                body = %excerpt(&response_text),
                "Failed to decode backend response"
            );
            ApiError::Decode(e.to_string())
        })
    }

    /// `GET` shorthand.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
        auth: AuthMode,
    ) -> Result<T, ApiError> {
        self.request(Method::GET, path, query, None, auth).await
    }

    /// `POST` shorthand.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
        body: &serde_json::Value,
        auth: AuthMode,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, path, query, Some(body), auth)
            .await
    }

    /// `PUT` shorthand.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
        body: &serde_json::Value,
        auth: AuthMode,
    ) -> Result<T, ApiError> {
        self.request(Method::PUT, path, query, Some(body), auth)
            .await
    }

    /// `DELETE` shorthand. The response body is discarded.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn delete(&self, path: &str, auth: AuthMode) -> Result<(), ApiError> {
        self.request::<serde_json::Value>(Method::DELETE, path, &[], None, auth)
            .await
            .map(|_| ())
    }
}

/// Extract a human-readable message from an error response.
///
/// Tries `error.message` (the backend's error envelope), then a top-level
/// `message`, then falls back to the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    let from_body = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .or_else(|| value.get("message"))
                .and_then(serde_json::Value::as_str)
                .filter(|m| !m.trim().is_empty())
                .map(str::to_string)
        });

    from_body.unwrap_or_else(|| {
        status
            .canonical_reason()
            .map_or_else(|| status.as_str().to_string(), str::to_string)
    })
}

fn excerpt(body: &str) -> String {
    body.chars().take(LOG_BODY_LIMIT).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn client(base: &str) -> ApiClient {
        let config = ClientConfig::new(Url::parse(base).unwrap());
        let tokens = TokenStore::new(Arc::new(MemoryStorage::new()), config.token_ttl);
        ApiClient::new(&config, tokens).unwrap()
    }

    #[test]
    fn test_error_message_from_error_envelope() {
        let body = r#"{"data":null,"error":{"status":404,"name":"NotFoundError","message":"Not Found"}}"#;
        assert_eq!(error_message(StatusCode::NOT_FOUND, body), "Not Found");
    }

    #[test]
    fn test_error_message_from_top_level_message() {
        let body = r#"{"message":"Invalid identifier or password"}"#;
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, body),
            "Invalid identifier or password"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_status_text() {
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "<html>upstream</html>"),
            "Bad Gateway"
        );
        assert_eq!(
            error_message(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":{"message":""}}"#),
            "Internal Server Error"
        );
    }

    #[test]
    fn test_url_keeps_base_path() {
        let api = client("http://localhost:1337/api/");
        let url = api
            .url(
                "/products/abc",
                &[("pagination[page]".to_string(), "2".to_string())],
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:1337/api/products/abc?pagination%5Bpage%5D=2"
        );
    }

    #[tokio::test]
    async fn test_required_auth_without_token_fails_before_sending() {
        // Port 9 (discard) would fail with a network error if a request were sent.
        let api = client("http://127.0.0.1:9/api");
        let err = api
            .delete("/products/abc", AuthMode::Required)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
    }
}
