use crate::api::{ApiError, ApiRequest, Session, SessionStore};
use crate::clients::QueryClient;
use crate::error::AuthError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

/// Digits in a login code.
pub const LOGIN_CODE_LEN: usize = 6;

/// Device platform reported with a push token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
}

/// Normalizes an Indian mobile number to `+91XXXXXXXXXX`.
pub fn normalize_phone(phone: &str) -> Result<String, AuthError> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    let local = match digits.len() {
        10 => digits.as_str(),
        12 if digits.starts_with("91") => &digits[2..],
        _ => return Err(AuthError::InvalidPhone(phone.to_string())),
    };
    if !matches!(local.chars().next(), Some('6'..='9')) {
        return Err(AuthError::InvalidPhone(phone.to_string()));
    }
    Ok(format!("+91{local}"))
}

/// Phone OTP sign-in and device registration.
///
/// Unlike the other clients this one has no cached reads; it owns the
/// [`SessionStore`] that the transport reads tokens from.
#[derive(Clone)]
pub struct AuthClient {
    inner: QueryClient,
    session: SessionStore,
}

impl AuthClient {
    pub fn new(inner: QueryClient, session: SessionStore) -> Self {
        Self { inner, session }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    #[instrument(skip(self))]
    pub async fn send_login_otp(&self, phone: &str) -> Result<(), AuthError> {
        let phone = normalize_phone(phone)?;
        debug!("Requesting login code");
        self.send(ApiRequest::function("send-otp", json!({ "phone": phone })))
            .await?;
        Ok(())
    }

    /// Verifies a login code and stores the resulting session.
    #[instrument(skip(self, code))]
    pub async fn verify_login_otp(&self, phone: &str, code: &str) -> Result<Session, AuthError> {
        let phone = normalize_phone(phone)?;
        if code.len() != LOGIN_CODE_LEN || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(AuthError::MalformedCode {
                expected: LOGIN_CODE_LEN,
            });
        }

        let value = self
            .send(ApiRequest::function(
                "verify-otp",
                json!({ "phone": phone, "otp": code }),
            ))
            .await?;
        let session: Session = serde_json::from_value(value).map_err(ApiError::from)?;
        info!(user_id = %session.user_id, role = ?session.role, "Signed in");
        self.session.set(session.clone()).await;
        Ok(session)
    }

    #[instrument(skip(self, token))]
    pub async fn register_push_token(&self, token: &str, platform: Platform) -> Result<(), AuthError> {
        debug!("Registering push token");
        self.send(ApiRequest::rpc(
            "register_push_token",
            json!({ "p_token": token, "p_platform": platform }),
        ))
        .await?;
        Ok(())
    }

    /// Forgets the session locally. The backend session simply expires.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) {
        self.session.clear().await;
        info!("Signed out");
    }

    async fn send(&self, request: ApiRequest) -> Result<Value, AuthError> {
        Ok(self.inner.transport().send(request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockTransport;
    use crate::api::{Method, Target};
    use crate::framework::CacheActor;
    use crate::model::Role;
    use std::sync::Arc;

    fn setup() -> (MockTransport, AuthClient) {
        let mock = MockTransport::new();
        let (actor, cache) = CacheActor::new(4);
        tokio::spawn(actor.run());
        let client = AuthClient::new(
            QueryClient::new(Arc::new(mock.clone()), cache),
            SessionStore::new(),
        );
        (mock, client)
    }

    #[test]
    fn test_phone_normalization() {
        assert_eq!(normalize_phone("98765 43210").unwrap(), "+919876543210");
        assert_eq!(normalize_phone("+91-9876543210").unwrap(), "+919876543210");
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("1234567890").is_err());
    }

    #[tokio::test]
    async fn test_malformed_code_sends_nothing() {
        let (mock, client) = setup();
        let err = client.verify_login_otp("9876543210", "12a4").await.unwrap_err();
        assert_eq!(err, AuthError::MalformedCode { expected: 6 });
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_verify_stores_session() {
        let (mock, client) = setup();
        mock.expect(Method::Post, Target::Function("verify-otp".into()))
            .return_ok(json!({
                "access_token": "jwt-abc",
                "refresh_token": "refresh-abc",
                "user_id": "user-1",
                "role": "delivery_staff"
            }));

        let session = client.verify_login_otp("9876543210", "123456").await.unwrap();

        assert_eq!(session.role, Some(Role::Delivery));
        assert_eq!(client.session().access_token().await.as_deref(), Some("jwt-abc"));
        assert_eq!(
            mock.requests()[0].body,
            Some(json!({ "phone": "+919876543210", "otp": "123456" }))
        );

        client.sign_out().await;
        assert!(client.session().get().await.is_none());
    }

    #[tokio::test]
    async fn test_wrong_code_surfaces_backend_message() {
        let (mock, client) = setup();
        mock.expect(Method::Post, Target::Function("verify-otp".into()))
            .return_err(ApiError::Backend {
                status: 400,
                code: Some("INVALID_OTP".into()),
                message: "invalid".into(),
            });

        let err = client.verify_login_otp("9876543210", "000000").await.unwrap_err();
        assert_eq!(err.user_message(), "The code you entered is incorrect.");
        assert!(client.session().get().await.is_none());
    }
}
