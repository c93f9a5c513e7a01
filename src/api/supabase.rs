//! # Supabase Transport
//!
//! Executes [`ApiRequest`]s against a Supabase project over HTTPS.
//!
//! Every request carries the project's `apikey` header and a bearer token:
//! the signed-in user's access token when there is one, the anon key
//! otherwise. A `401` triggers exactly one refresh through
//! `/auth/v1/token?grant_type=refresh_token`; if that fails the session is
//! cleared and the caller sees [`ApiError::Unauthorized`]. There is no
//! other retry.

use crate::api::{ApiError, ApiRequest, Method, Session, SessionStore, Transport};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const PGRST_OBJECT: &str = "application/vnd.pgrst.object+json";

#[derive(Debug, Clone)]
pub struct SupabaseTransport {
    http: Client,
    base_url: String,
    anon_key: String,
    session: SessionStore,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
}

impl SupabaseTransport {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        session: SessionStore,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("delivery-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            session,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    async fn execute(&self, request: &ApiRequest, token: &str) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}{}", self.base_url, request.target.path());
        let mut builder = match request.method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
            Method::Patch => self.http.patch(&url),
            Method::Delete => self.http.delete(&url),
        }
        .header("apikey", &self.anon_key)
        .bearer_auth(token)
        .query(&request.query);

        if request.single {
            builder = builder.header("Accept", PGRST_OBJECT);
        }
        if matches!(request.method, Method::Patch | Method::Post) {
            builder = builder.header("Prefer", "return=representation");
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        Ok(builder.send().await?)
    }

    /// Exchanges the refresh token for a new access token.
    /// Returns `false` if there was nothing to refresh or the backend refused.
    async fn refresh_session(&self) -> bool {
        let Some(current) = self.session.get().await else {
            return false;
        };
        let Some(refresh_token) = current.refresh_token.clone() else {
            return false;
        };

        let url = format!("{}/auth/v1/token", self.base_url);
        let response = self
            .http
            .post(&url)
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => match resp.json::<TokenResponse>().await {
                Ok(tokens) => {
                    let user_id = current.user_id.clone();
                    self.session
                        .set(Session {
                            access_token: tokens.access_token,
                            refresh_token: tokens.refresh_token.or(Some(refresh_token)),
                            ..current
                        })
                        .await;
                    info!(%user_id, "Session refreshed");
                    true
                }
                Err(e) => {
                    warn!(error = %e, "Refresh response unreadable");
                    false
                }
            },
            Ok(resp) => {
                warn!(status = resp.status().as_u16(), "Refresh rejected");
                false
            }
            Err(e) => {
                warn!(error = %e, "Refresh failed");
                false
            }
        }
    }

    async fn decode(response: reqwest::Response) -> Result<Value, ApiError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_response(status.as_u16(), &body));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl Transport for SupabaseTransport {
    #[instrument(skip(self, request), fields(request = %request))]
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let token = self
            .session
            .access_token()
            .await
            .unwrap_or_else(|| self.anon_key.clone());

        let response = self.execute(&request, &token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            debug!(status = response.status().as_u16(), "Response");
            return Self::decode(response).await;
        }

        if !self.refresh_session().await {
            self.session.clear().await;
            return Err(ApiError::Unauthorized);
        }

        let token = self
            .session
            .access_token()
            .await
            .ok_or(ApiError::Unauthorized)?;
        let response = self.execute(&request, &token).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            self.session.clear().await;
            return Err(ApiError::Unauthorized);
        }
        Self::decode(response).await
    }
}
