//! reqwest implementation of [`AuthBackend`].
//!
//! Every request goes through [`ApiClient::request`], which is the only place
//! that attaches the `Authorization: Bearer` header.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use roadfleet_access::{
    AuthBackend, AuthResponse, BackendError, BearerToken, Credentials, Registration, TokenResponse,
};
use rootcause::prelude::Report;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::{Value as JsonValue, json};
use tracing::{debug, instrument};

use crate::config::ApiConfig;
use crate::error::ApiClientError;

const LOGIN_PATH: &str = "/auth/login";
const REGISTER_PATH: &str = "/auth/register";
const LOGOUT_PATH: &str = "/auth/logout";
const ME_PATH: &str = "/auth/me";
const REFRESH_PATH: &str = "/auth/refresh";

/// HTTP client for the backend's `/auth` endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl ApiClient {
    /// Creates a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not http(s) or the HTTP client
    /// cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self, Report<ApiClientError>> {
        let base_url = config.base_url();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiClientError::InvalidBaseUrl {
                url: base_url.to_string(),
            }
            .into());
        }

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiClientError::ClientBuild {
                details: e.to_string(),
            })?;

        Ok(Self { http, config })
    }

    /// Returns the configuration the client was built with.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Starts a request to `path`, authenticated with `token` when given.
    pub fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&BearerToken>,
    ) -> RequestBuilder {
        let builder = self.http.request(method, self.config.endpoint(path));
        match token {
            Some(token) => builder.bearer_auth(token.as_str()),
            None => builder,
        }
    }

    /// Sends a request and turns non-success statuses into `Rejected`.
    async fn execute(&self, builder: RequestBuilder) -> Result<Response, BackendError> {
        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_detail(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
        debug!(status = status.as_u16(), %message, "backend rejected request");
        Err(BackendError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn execute_json<T>(&self, builder: RequestBuilder) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        self.execute(builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout
                } else {
                    BackendError::InvalidResponse {
                        reason: e.to_string(),
                    }
                }
            })
    }
}

#[async_trait]
impl AuthBackend for ApiClient {
    #[instrument(skip_all, fields(email = %credentials.email))]
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, BackendError> {
        let body = json!({
            "email": credentials.email,
            "password": credentials.password.expose_secret(),
        });
        self.execute_json(self.request(Method::POST, LOGIN_PATH, None).json(&body))
            .await
    }

    #[instrument(skip_all, fields(email = %registration.credentials.email))]
    async fn register(&self, registration: &Registration) -> Result<AuthResponse, BackendError> {
        let body = json!({
            "name": registration.name,
            "email": registration.credentials.email,
            "password": registration.credentials.password.expose_secret(),
        });
        self.execute_json(self.request(Method::POST, REGISTER_PATH, None).json(&body))
            .await
    }

    #[instrument(skip_all)]
    async fn logout(&self, token: &BearerToken) -> Result<(), BackendError> {
        self.execute(self.request(Method::POST, LOGOUT_PATH, Some(token)))
            .await
            .map(|_| ())
    }

    #[instrument(skip_all)]
    async fn me(&self, token: &BearerToken) -> Result<JsonValue, BackendError> {
        self.execute_json(self.request(Method::GET, ME_PATH, Some(token)))
            .await
    }

    #[instrument(skip_all)]
    async fn refresh(&self, token: &BearerToken) -> Result<TokenResponse, BackendError> {
        self.execute_json(self.request(Method::POST, REFRESH_PATH, Some(token)))
            .await
    }
}

fn transport_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout
    } else {
        BackendError::Transport {
            reason: err.to_string(),
        }
    }
}

/// Extracts the human-readable message from an error body.
///
/// The backend reports `{"detail": "..."}`; anything else is passed through
/// as raw text.
fn error_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    let detail = serde_json::from_str::<JsonValue>(body)
        .ok()
        .and_then(|value| value.get("detail").and_then(JsonValue::as_str).map(str::to_string));
    Some(detail.unwrap_or_else(|| body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(ApiConfig::new(server.uri())).expect("client")
    }

    fn credentials() -> Credentials {
        Credentials::new("a@b.com", SecretString::from("secret".to_string()))
    }

    fn user() -> JsonValue {
        json!({
            "id": "1",
            "email": "a@b.com",
            "name": "A",
            "role": "company_admin",
            "company_id": "c1",
            "status": "active",
            "created_at": "2024-02-01T09:00:00"
        })
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = ApiClient::new(ApiConfig::new("ftp://fleet")).unwrap_err();
        assert!(matches!(
            err.current_context(),
            ApiClientError::InvalidBaseUrl { .. }
        ));
    }

    #[test]
    fn error_detail_prefers_json_detail() {
        assert_eq!(
            error_detail(r#"{"detail":"Invalid credentials"}"#).as_deref(),
            Some("Invalid credentials")
        );
        assert_eq!(
            error_detail("Bad Gateway").as_deref(),
            Some("Bad Gateway")
        );
        assert_eq!(error_detail("  "), None);
    }

    #[tokio::test]
    async fn login_posts_credentials() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({"email": "a@b.com", "password": "secret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Login successful",
                "user": user(),
                "access_token": "tok1",
                "token_type": "bearer",
                "expires_in": 86400
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server).login(&credentials()).await.expect("login");
        assert_eq!(response.access_token.as_deref(), Some("tok1"));
        assert_eq!(response.user, Some(user()));
    }

    #[tokio::test]
    async fn login_rejection_carries_detail() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid credentials"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).login(&credentials()).await.unwrap_err();
        assert_eq!(
            err,
            BackendError::Rejected {
                status: 401,
                message: "Invalid credentials".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn register_posts_name_email_password() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/register"))
            .and(body_json(json!({
                "name": "X",
                "email": "a@b.com",
                "password": "secret"
            })))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"detail": "User already exists"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .register(&Registration::new("X", credentials()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn authenticated_calls_attach_bearer_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .and(header("Authorization", "Bearer tok1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .and(header("Authorization", "Bearer tok1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok2",
                "token_type": "bearer",
                "expires_in": 86400
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .and(header("Authorization", "Bearer tok1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"message": "Logout successful"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let token = BearerToken::new("tok1");

        assert_eq!(client.me(&token).await.expect("me"), user());
        let refreshed = client.refresh(&token).await.expect("refresh");
        assert_eq!(refreshed.access_token.as_deref(), Some("tok2"));
        client.logout(&token).await.expect("logout");
    }

    #[tokio::test]
    async fn plain_text_error_body_is_passed_through() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .me(&BearerToken::new("tok1"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BackendError::Rejected {
                status: 502,
                message: "upstream down".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn non_json_success_is_invalid_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).login(&credentials()).await.unwrap_err();
        assert!(matches!(err, BackendError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let client = ApiClient::new(ApiConfig::new(uri)).expect("client");
        let err = client.login(&credentials()).await.unwrap_err();
        assert!(matches!(
            err,
            BackendError::Transport { .. } | BackendError::Timeout
        ));
    }
}
