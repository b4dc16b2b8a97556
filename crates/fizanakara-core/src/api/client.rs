//! Authenticated API client for the Fizanakara backend.
//!
//! Every request carries the stored access token as a bearer credential.
//! When the server answers 401 the client refreshes the access token once
//! and re-sends the request; if the refresh fails the session is wiped and
//! the login boundary is signalled.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::Session;
use crate::config::{Config, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::models::{RefreshRequest, RefreshResponse};

use super::ApiError;

/// Token refresh endpoint, relative to the base URL
pub(crate) const REFRESH_PATH: &str = "/refresh";

/// A single logical request. `retried` is scoped to this request only, so
/// concurrent requests each run their own refresh cycle.
struct Request {
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
    retried: bool,
    /// Public endpoints (login, password reset) never trigger a refresh
    public: bool,
}

impl Request {
    fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            body: None,
            retried: false,
            public: false,
        }
    }

    fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body).context("Failed to serialize request body")?);
        Ok(self)
    }

    fn public(mut self) -> Self {
        self.public = true;
        self
    }
}

/// API client for the Fizanakara backend.
/// Clone is cheap - reqwest::Client and Session are both reference counted.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    /// Create a client with the default request timeout
    pub fn new(base_url: impl Into<String>, session: Session) -> Result<Self> {
        Self::with_timeout(base_url, session, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, session: Session, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn from_config(config: &Config, session: Session) -> Result<Self> {
        Self::with_timeout(
            config.api_base_url.clone(),
            session,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Bearer credential from the session; none when no token is stored
    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(token) = self.session.access_token()? {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(headers)
    }

    /// Send once with whatever token the session holds right now
    async fn dispatch(&self, req: &Request) -> Result<reqwest::Response> {
        let mut builder = self
            .client
            .request(req.method.clone(), self.url(&req.path))
            .headers(self.auth_headers()?);
        if let Some(ref body) = req.body {
            builder = builder.json(body);
        }

        debug!(method = %req.method, path = %req.path, retried = req.retried, "Sending request");
        builder
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to send {} request to {}", req.method, req.path))
    }

    /// Run the request through the refresh protocol:
    /// `SENT -> OK | UNAUTHORIZED -> REFRESHING -> RETRIED_OK | LOGGED_OUT`.
    async fn execute(&self, mut req: Request) -> Result<reqwest::Response> {
        loop {
            let response = self.dispatch(&req).await?;
            if response.status() != StatusCode::UNAUTHORIZED || req.public {
                return Self::check_response(response).await;
            }

            if req.retried {
                warn!(path = %req.path, "Still unauthorized after token refresh");
                return Err(ApiError::Unauthorized.into());
            }
            req.retried = true;

            match self.refresh_access_token().await {
                Ok(_) => {
                    debug!(path = %req.path, "Access token refreshed, retrying request");
                }
                Err(e) => {
                    warn!(path = %req.path, error = %e, "Token refresh failed, ending session");
                    if let Err(clear_err) = self.session.require_login() {
                        warn!(error = %clear_err, "Failed to clear stored credentials");
                    }
                    return Err(ApiError::Unauthorized.into());
                }
            }
        }
    }

    /// Exchange the stored refresh token for a new access token and persist it.
    ///
    /// Goes straight to the transport: a failing refresh is never itself
    /// refreshed.
    pub(crate) async fn refresh_access_token(&self) -> Result<String> {
        let refresh_token = self
            .session
            .refresh_token()?
            .ok_or_else(|| anyhow::anyhow!("No refresh token stored"))?;

        let response = self
            .client
            .post(self.url(REFRESH_PATH))
            .header(header::ACCEPT, "application/json")
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(ApiError::from)
            .context("Failed to send token refresh request")?;

        let response = Self::check_response(response).await?;
        let refreshed: RefreshResponse = Self::decode(response, REFRESH_PATH).await?;
        self.session.set_access_token(&refreshed.access_token)?;
        Ok(refreshed.access_token)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response, path: &str) -> Result<T> {
        let text = response
            .text()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to read response body from {}", path))?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", path, e)).into()
        })
    }

    // ===== Typed helpers =====

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.execute(Request::new(Method::GET, path)).await?;
        Self::decode(response, path).await
    }

    pub(crate) async fn get_text(&self, path: &str, public: bool) -> Result<String> {
        let mut req = Request::new(Method::GET, path);
        if public {
            req = req.public();
        }
        let response = self.execute(req).await?;
        Ok(response.text().await.map_err(ApiError::from)?)
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        let response = self.execute(Request::new(Method::POST, path).json(body)?).await?;
        Self::decode(response, path).await
    }

    /// POST without a body (action endpoints such as promotion)
    pub(crate) async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.execute(Request::new(Method::POST, path)).await?;
        Self::decode(response, path).await
    }

    /// POST to an endpoint that does not require a session
    pub(crate) async fn post_public<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .execute(Request::new(Method::POST, path).json(body)?.public())
            .await?;
        Self::decode(response, path).await
    }

    /// Public POST whose response is a plain string message
    pub(crate) async fn post_public_text<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<String> {
        let response = self
            .execute(Request::new(Method::POST, path).json(body)?.public())
            .await?;
        Ok(response.text().await.map_err(ApiError::from)?)
    }

    pub(crate) async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        let response = self.execute(Request::new(Method::PUT, path).json(body)?).await?;
        Self::decode(response, path).await
    }

    pub(crate) async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        let response = self.execute(Request::new(Method::PATCH, path).json(body)?).await?;
        Self::decode(response, path).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.execute(Request::new(Method::DELETE, path)).await?;
        Self::decode(response, path).await
    }

    /// DELETE ignoring whatever body comes back (often empty)
    pub(crate) async fn delete_unit(&self, path: &str) -> Result<()> {
        self.execute(Request::new(Method::DELETE, path)).await?;
        Ok(())
    }
}

/// Reject identifiers that would produce a malformed path
pub(crate) fn path_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() || id.contains('/') || id.contains(char::is_whitespace) {
        return Err(anyhow::anyhow!("Invalid identifier: {:?}", id));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Value};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::{CredentialKey, CredentialStore, MemoryStore, SessionStatus};

    fn session_with(access: Option<&str>, refresh: Option<&str>) -> (Session, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        if let Some(token) = access {
            store.set(CredentialKey::AccessToken, token).unwrap();
        }
        if let Some(token) = refresh {
            store.set(CredentialKey::RefreshToken, token).unwrap();
        }
        store.set(CredentialKey::User, r#"{"id":"ADM1","email":"a@b.mg"}"#).unwrap();
        (Session::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_attaches_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/members"))
            .and(header("authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let (session, _) = session_with(Some("access-1"), None);
        let client = ApiClient::new(server.uri(), session).unwrap();
        let members: Vec<Value> = client.get("/members").await.unwrap();
        assert!(members.is_empty());
    }

    #[tokio::test]
    async fn test_no_token_sends_unauthenticated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string("UP"))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), Session::in_memory()).unwrap();
        assert_eq!(client.get_text("/health", true).await.unwrap(), "UP");

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_request_retried_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/members"))
            .and(header("authorization", "Bearer expired"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/refresh"))
            .and(body_json(json!({"refreshToken": "refresh-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "fresh"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/members"))
            .and(header("authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "MBR1"}])))
            .expect(1)
            .mount(&server)
            .await;

        let (session, store) = session_with(Some("expired"), Some("refresh-1"));
        let client = ApiClient::new(server.uri(), session.clone()).unwrap();
        let members: Vec<Value> = client.get("/members").await.unwrap();

        assert_eq!(members.len(), 1);
        assert_eq!(store.get(CredentialKey::AccessToken).unwrap().as_deref(), Some("fresh"));
        assert_eq!(session.status(), SessionStatus::Active);
    }

    #[tokio::test]
    async fn test_second_unauthorized_propagates_without_another_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admins/all"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "fresh"})))
            .expect(1)
            .mount(&server)
            .await;

        let (session, _) = session_with(Some("expired"), Some("refresh-1"));
        let client = ApiClient::new(server.uri(), session.clone()).unwrap();
        let err = client.get::<Vec<Value>>("/admins/all").await.unwrap_err();

        assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::Unauthorized)));
        assert_eq!(session.access_token().unwrap().as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_credentials_and_requires_login() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/members"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/refresh"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Refresh token expired"})))
            .expect(1)
            .mount(&server)
            .await;

        let (session, store) = session_with(Some("expired"), Some("stale"));
        let mut status = session.subscribe();
        let client = ApiClient::new(server.uri(), session).unwrap();
        let err = client.get::<Vec<Value>>("/members").await.unwrap_err();

        assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::Unauthorized)));
        assert!(store.is_empty());
        assert!(status.has_changed().unwrap());
        assert_eq!(
            *status.borrow_and_update(),
            SessionStatus::LoginRequired { redirect_to: "/login".into() }
        );
    }

    #[tokio::test]
    async fn test_missing_refresh_token_ends_session_without_calling_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/members"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "x"})))
            .expect(0)
            .mount(&server)
            .await;

        let (session, store) = session_with(Some("expired"), None);
        let client = ApiClient::new(server.uri(), session.clone()).unwrap();
        assert!(client.get::<Vec<Value>>("/members").await.is_err());
        assert!(store.is_empty());
        assert!(matches!(session.status(), SessionStatus::LoginRequired { .. }));
    }

    #[tokio::test]
    async fn test_malformed_refresh_body_counts_as_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/members"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .expect(1)
            .mount(&server)
            .await;

        let (session, store) = session_with(Some("expired"), Some("refresh-1"));
        let client = ApiClient::new(server.uri(), session).unwrap();
        assert!(client.get::<Vec<Value>>("/members").await.is_err());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_other_errors_propagate_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admins/persons/MBR404"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Person not found"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admins/persons"))
            .respond_with(ResponseTemplate::new(500).set_body_string("database down"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/refresh"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (session, _) = session_with(Some("valid"), Some("refresh-1"));
        let client = ApiClient::new(server.uri(), session.clone()).unwrap();

        let err = client.get::<Value>("/admins/persons/MBR404").await.unwrap_err();
        assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::NotFound(m)) if m == "Person not found"));

        let err = client.get::<Value>("/admins/persons").await.unwrap_err();
        assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::ServerError(m)) if m == "database down"));

        assert_eq!(session.status(), SessionStatus::Active);
    }

    #[tokio::test]
    async fn test_public_request_does_not_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Bad credentials"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/refresh"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (session, store) = session_with(None, Some("refresh-1"));
        let client = ApiClient::new(server.uri(), session).unwrap();
        let err = client
            .post_public::<Value, _>("/login", &json!({"email": "a@b.mg", "password": "wrong!"}))
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::Unauthorized)));
        assert_eq!(store.get(CredentialKey::RefreshToken).unwrap().as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn test_network_error_is_classified() {
        let client = ApiClient::with_timeout(
            "http://127.0.0.1:9",
            Session::in_memory(),
            Duration::from_millis(500),
        )
        .unwrap();
        let err = client.get::<Value>("/members").await.unwrap_err();
        assert!(err.downcast_ref::<ApiError>().map(ApiError::is_network_error).unwrap_or(false));
    }

    #[test]
    fn test_path_id() {
        assert_eq!(path_id(" MBR2024-001 ").unwrap(), "MBR2024-001");
        assert!(path_id("").is_err());
        assert!(path_id("../admins").is_err());
        assert!(path_id("a b").is_err());
    }
}
