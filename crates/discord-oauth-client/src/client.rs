//! Discord OAuth HTTP client

use crate::error::{DiscordError, Result};
use crate::types::{DiscordConfig, DiscordUser, TokenResponse};
use moka::future::Cache;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const USER_CACHE_TTL_SECS: u64 = 60;
const USER_CACHE_CAPACITY: u64 = 1_000;

/// Client for Discord's OAuth2 authorization-code flow
pub struct DiscordClient {
    http: reqwest::Client,
    config: DiscordConfig,
    api_base_url: String,
    authorize_url: String,
    /// `/users/@me` responses keyed by access token
    users: Cache<String, DiscordUser>,
}

impl DiscordClient {
    /// Base URL for the Discord REST API
    pub const API_BASE_URL: &'static str = "https://discord.com/api";
    /// Browser-facing authorization page
    pub const AUTHORIZE_URL: &'static str = "https://discord.com/oauth2/authorize";

    /// Create a client against the public Discord endpoints (30 second timeout)
    pub fn new(config: DiscordConfig) -> Result<Self> {
        Self::with_endpoints(config, Self::API_BASE_URL, Self::AUTHORIZE_URL)
    }

    /// Create a client against custom endpoints
    pub fn with_endpoints(
        config: DiscordConfig,
        api_base_url: &str,
        authorize_url: &str,
    ) -> Result<Self> {
        Url::parse(authorize_url)
            .map_err(|e| DiscordError::Config(format!("invalid authorize URL: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let users = Cache::builder()
            .max_capacity(USER_CACHE_CAPACITY)
            .time_to_live(Duration::from_secs(USER_CACHE_TTL_SECS))
            .build();

        Ok(Self {
            http,
            config,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            authorize_url: authorize_url.to_string(),
            users,
        })
    }

    /// URL of the consent page the user's browser should be redirected to
    pub fn authorize_url(&self, state: Option<&str>) -> String {
        let scope = self.config.scopes.join(" ");
        let mut params = vec![
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", scope.as_str()),
        ];
        if let Some(state) = state {
            params.push(("state", state));
        }

        // Validated in the constructor
        match Url::parse_with_params(&self.authorize_url, &params) {
            Ok(url) => url.to_string(),
            Err(_) => self.authorize_url.clone(),
        }
    }

    /// Exchange the `code` from the OAuth callback for an access token
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let url = format!("{}/oauth2/token", self.api_base_url);
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        debug!(url = %url, "Exchanging OAuth code");
        let response = self.http.post(&url).form(&form).send().await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let token: TokenResponse = response.json().await?;
        debug!(scope = %token.scope, expires_in = token.expires_in, "OAuth code exchanged");
        Ok(token)
    }

    /// Fetch the user the access token belongs to
    pub async fn current_user(&self, access_token: &str) -> Result<DiscordUser> {
        if let Some(user) = self.users.get(access_token).await {
            return Ok(user);
        }

        let url = format!("{}/users/@me", self.api_base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let user: DiscordUser = response.json().await?;
        debug!(user_id = %user.id, "Fetched Discord user");

        self.users
            .insert(access_token.to_string(), user.clone())
            .await;
        Ok(user)
    }
}

/// Turn a failed response into an error, preferring Discord's own message
async fn api_error(response: reqwest::Response) -> DiscordError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unexpected response")
            .to_string()
    });

    warn!(status = %status, message = %message, "Discord request failed");
    DiscordError::Api {
        status: status.as_u16(),
        message,
    }
}

/// OAuth endpoints answer `{error, error_description}`, the REST API `{message, code}`
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error_description", "message", "error"]
        .iter()
        .find_map(|field| value.get(field).and_then(|v| v.as_str()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};
    use axum::{Form, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const ACCESS_TOKEN: &str = "6qrZcUqja7812RVdnEKjpzOL4CvHBFG";

    /// What the local Discord stand-in received
    #[derive(Default)]
    struct Received {
        token_form: Mutex<Option<HashMap<String, String>>>,
        authorization: Mutex<Option<String>>,
        user_requests: AtomicUsize,
    }

    async fn token_endpoint(
        State(received): State<Arc<Received>>,
        Form(form): Form<HashMap<String, String>>,
    ) -> Response {
        let valid = form.get("code").map(String::as_str) == Some("good-code");
        *received.token_form.lock().unwrap() = Some(form);

        if !valid {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "invalid_grant",
                    "error_description": "Invalid \"code\" in request."
                })),
            )
                .into_response();
        }

        Json(json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "Bearer",
            "expires_in": 604800,
            "refresh_token": "D43f5y0ahjqew82jZ4NViEr2YafMKhue",
            "scope": "identify"
        }))
        .into_response()
    }

    async fn me_endpoint(State(received): State<Arc<Received>>, headers: HeaderMap) -> Response {
        received.user_requests.fetch_add(1, Ordering::SeqCst);
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        *received.authorization.lock().unwrap() = authorization.clone();

        if authorization.as_deref() != Some(format!("Bearer {}", ACCESS_TOKEN).as_str()) {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "401: Unauthorized", "code": 0})),
            )
                .into_response();
        }

        Json(json!({
            "id": "80351110224678912",
            "username": "nelly",
            "global_name": "Nelly",
            "discriminator": "0",
            "avatar": "8342729096ea3675442027381ff50dfe"
        }))
        .into_response()
    }

    /// Serve a Discord stand-in on an ephemeral port and return its API base
    async fn spawn_api(received: Arc<Received>) -> String {
        let app = Router::new()
            .route("/api/oauth2/token", post(token_endpoint))
            .route("/api/users/@me", get(me_endpoint))
            .with_state(received);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api", addr)
    }

    async fn local_client() -> (DiscordClient, Arc<Received>) {
        let received = Arc::new(Received::default());
        let api = spawn_api(received.clone()).await;
        let client =
            DiscordClient::with_endpoints(config(), &api, DiscordClient::AUTHORIZE_URL).unwrap();
        (client, received)
    }

    fn config() -> DiscordConfig {
        DiscordConfig::new(
            "1234567890",
            "s3cret",
            "http://localhost:3000/auth/discord/callback",
        )
    }

    #[test]
    fn test_authorize_url() {
        let client = DiscordClient::new(config()).unwrap();
        let url = Url::parse(&client.authorize_url(None)).unwrap();

        assert_eq!(url.host_str(), Some("discord.com"));
        assert_eq!(url.path(), "/oauth2/authorize");

        let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(params.contains(&("client_id".into(), "1234567890".into())));
        assert!(params.contains(&("response_type".into(), "code".into())));
        assert!(params.contains(&("scope".into(), "identify".into())));
        assert!(params.contains(&(
            "redirect_uri".into(),
            "http://localhost:3000/auth/discord/callback".into()
        )));
        assert!(!params.iter().any(|(k, _)| k == "state"));
    }

    #[test]
    fn test_authorize_url_with_state_and_scopes() {
        let mut config = config();
        config.scopes = vec!["identify".to_string(), "email".to_string()];
        let client = DiscordClient::new(config).unwrap();

        let url = Url::parse(&client.authorize_url(Some("xyz"))).unwrap();
        let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(params.contains(&("scope".into(), "identify email".into())));
        assert!(params.contains(&("state".into(), "xyz".into())));
    }

    #[test]
    fn test_invalid_authorize_url_is_rejected() {
        let result = DiscordClient::with_endpoints(config(), "http://localhost", "not a url");
        assert!(matches!(result, Err(DiscordError::Config(_))));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Invalid \"code\" in request."}"#),
            Some("Invalid \"code\" in request.".to_string())
        );
        assert_eq!(
            error_message(r#"{"message":"401: Unauthorized","code":0}"#),
            Some("401: Unauthorized".to_string())
        );
        assert_eq!(error_message("<html>bad gateway</html>"), None);
    }

    #[tokio::test]
    async fn test_exchange_code_unreachable_api() {
        let client = DiscordClient::with_endpoints(
            config(),
            "http://127.0.0.1:1/api",
            DiscordClient::AUTHORIZE_URL,
        )
        .unwrap();

        let result = client.exchange_code("abc").await;
        assert!(matches!(result, Err(DiscordError::Http(_))));
    }

    #[tokio::test]
    async fn test_exchange_code_posts_form() {
        let (client, received) = local_client().await;

        let token = client.exchange_code("good-code").await.unwrap();
        assert_eq!(token.access_token, ACCESS_TOKEN);
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, 604800);
        assert_eq!(token.scope, "identify");
        assert!(token.refresh_token.is_some());

        let form = received.token_form.lock().unwrap().clone().unwrap();
        assert_eq!(form["grant_type"], "authorization_code");
        assert_eq!(form["code"], "good-code");
        assert_eq!(
            form["redirect_uri"],
            "http://localhost:3000/auth/discord/callback"
        );
        assert_eq!(form["client_id"], "1234567890");
        assert_eq!(form["client_secret"], "s3cret");
    }

    #[tokio::test]
    async fn test_exchange_code_rejected() {
        let (client, _received) = local_client().await;

        match client.exchange_code("stale-code").await {
            Err(DiscordError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid \"code\" in request.");
            }
            other => panic!("expected API error, got {:?}", other.map(|t| t.scope)),
        }
    }

    #[tokio::test]
    async fn test_current_user_sends_bearer_token() {
        let (client, received) = local_client().await;

        let user = client.current_user(ACCESS_TOKEN).await.unwrap();
        assert_eq!(user.id, "80351110224678912");
        assert_eq!(user.username, "nelly");
        assert_eq!(user.global_name.as_deref(), Some("Nelly"));
        assert_eq!(
            user.avatar_url(),
            "https://cdn.discordapp.com/avatars/80351110224678912/8342729096ea3675442027381ff50dfe.png"
        );

        assert_eq!(
            received.authorization.lock().unwrap().as_deref(),
            Some(format!("Bearer {}", ACCESS_TOKEN).as_str())
        );
    }

    #[tokio::test]
    async fn test_current_user_is_cached_per_token() {
        let (client, received) = local_client().await;

        client.current_user(ACCESS_TOKEN).await.unwrap();
        let again = client.current_user(ACCESS_TOKEN).await.unwrap();
        assert_eq!(again.username, "nelly");
        assert_eq!(received.user_requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_current_user_unauthorized() {
        let (client, received) = local_client().await;

        match client.current_user("revoked-token").await {
            Err(DiscordError::Api { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "401: Unauthorized");
            }
            other => panic!("expected API error, got {:?}", other.map(|u| u.id)),
        }

        // Failures are not cached
        assert!(client.current_user("revoked-token").await.is_err());
        assert_eq!(received.user_requests.load(Ordering::SeqCst), 2);
    }
}
