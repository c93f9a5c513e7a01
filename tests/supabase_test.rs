use delivery_sync::api::{ApiError, ApiRequest, Session, SessionStore, SupabaseTransport, Transport};
use delivery_sync::model::Role;
use mockito::Matcher;
use serde_json::json;

fn signed_in(access: &str, refresh: Option<&str>) -> Session {
    Session {
        access_token: access.to_string(),
        refresh_token: refresh.map(str::to_string),
        user_id: "user-1".into(),
        role: Some(Role::Admin),
    }
}

#[tokio::test]
async fn test_requests_carry_apikey_and_filters() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/rest/v1/orders")
        .match_header("apikey", "anon-key")
        .match_header("authorization", "Bearer anon-key")
        .match_header("accept", "application/vnd.pgrst.object+json")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("select".into(), "*".into()),
            Matcher::UrlEncoded("id".into(), "eq.order-1".into()),
        ]))
        .with_body(r#"{"id":"order-1"}"#)
        .create_async()
        .await;

    let transport = SupabaseTransport::new(server.url(), "anon-key", SessionStore::new()).unwrap();
    let value = transport
        .send(ApiRequest::select("orders", "*").eq("id", "order-1").single())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(value, json!({ "id": "order-1" }));
}

#[tokio::test]
async fn test_unauthorized_refreshes_once_and_retries() {
    let mut server = mockito::Server::new_async().await;
    let expired = server
        .mock("POST", "/rest/v1/rpc/assign_delivery_staff")
        .match_header("authorization", "Bearer old-token")
        .with_status(401)
        .with_body(r#"{"message":"JWT expired"}"#)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/v1/token")
        .match_query(Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()))
        .match_body(Matcher::Json(json!({ "refresh_token": "refresh-1" })))
        .with_body(r#"{"access_token":"new-token","refresh_token":"refresh-2"}"#)
        .expect(1)
        .create_async()
        .await;
    let retried = server
        .mock("POST", "/rest/v1/rpc/assign_delivery_staff")
        .match_header("authorization", "Bearer new-token")
        .with_body("")
        .expect(1)
        .create_async()
        .await;

    let session = SessionStore::new();
    session.set(signed_in("old-token", Some("refresh-1"))).await;
    let transport = SupabaseTransport::new(server.url(), "anon-key", session.clone()).unwrap();

    let value = transport
        .send(ApiRequest::rpc(
            "assign_delivery_staff",
            json!({ "p_order_id": "order-1", "p_staff_id": "staff-1" }),
        ))
        .await
        .unwrap();

    expired.assert_async().await;
    refresh.assert_async().await;
    retried.assert_async().await;
    assert_eq!(value, serde_json::Value::Null);

    let current = session.get().await.unwrap();
    assert_eq!(current.access_token, "new-token");
    assert_eq!(current.refresh_token.as_deref(), Some("refresh-2"));
    assert_eq!(current.role, Some(Role::Admin));
}

#[tokio::test]
async fn test_failed_refresh_clears_session() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/rest/v1/orders")
        .match_query(Matcher::Any)
        .with_status(401)
        .create_async()
        .await;
    server
        .mock("POST", "/auth/v1/token")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(r#"{"error":"invalid_grant"}"#)
        .create_async()
        .await;

    let session = SessionStore::new();
    session.set(signed_in("old-token", Some("stale"))).await;
    let transport = SupabaseTransport::new(server.url(), "anon-key", session.clone()).unwrap();

    let err = transport
        .send(ApiRequest::select("orders", "*"))
        .await
        .unwrap_err();

    assert_eq!(err, ApiError::Unauthorized);
    assert!(session.get().await.is_none());
}

#[tokio::test]
async fn test_backend_error_codes_are_decoded() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/functions/v1/verify-delivery-otp")
        .with_status(400)
        .with_body(r#"{"error":{"code":"INVALID_DELIVERY_OTP","message":"OTP mismatch"}}"#)
        .create_async()
        .await;

    let transport = SupabaseTransport::new(server.url(), "anon-key", SessionStore::new()).unwrap();
    let err = transport
        .send(ApiRequest::function(
            "verify-delivery-otp",
            json!({ "order_id": "order-1", "otp": "0000" }),
        ))
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some("INVALID_DELIVERY_OTP"));
    assert_eq!(err.status(), Some(400));
}
