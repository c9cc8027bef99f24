//! Session manager driving the real API client against a mock server.

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use std::sync::Arc;
use storefront_api::{ApiClient, ClientConfig};
use storefront_core::Role;
use storefront_core::Credentials;
use storefront_session::{
    FileTokenStorage, InvalidationReason, LocalBus, MemoryTokenStorage, RefreshCookieFile,
    SessionError, SessionManager, SessionOptions, SessionState, StorageScope, TokenStorage,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mint(expires_in: i64, role: &str) -> String {
    let claims = json!({ "id": 7, "role": role, "exp": Utc::now().timestamp() + expires_in });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"server-secret")).unwrap()
}

fn manager_for(server: &MockServer, storage: &MemoryTokenStorage) -> (SessionManager, ApiClient) {
    let api = ApiClient::new(ClientConfig::new(server.uri())).unwrap();
    let manager = SessionManager::new(
        Arc::new(api.clone()),
        Arc::new(storage.clone()),
        Arc::new(LocalBus::new()),
        SessionOptions::default(),
    );
    (manager, api)
}

#[tokio::test]
async fn test_login_fetches_profile_with_bearer() {
    let server = MockServer::start().await;
    let token = mint(3_600, "ADMIN");
    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "name": "Dewi",
            "email": "dewi@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let storage = MemoryTokenStorage::new();
    let (manager, api) = manager_for(&server, &storage);

    let session = manager.login(&token, StorageScope::Durable).await.unwrap();
    assert_eq!(session.profile.name, "Dewi");
    assert_eq!(session.role, Role::Admin);
    assert!(matches!(manager.state(), SessionState::RefreshScheduled(_)));

    let admin_api = manager.authorized(&api, Role::Admin).unwrap();
    assert!(admin_api.is_authorized());
}

#[tokio::test]
async fn test_rejected_token_ends_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "invalid token" })))
        .mount(&server)
        .await;

    let storage = MemoryTokenStorage::new();
    let (manager, _) = manager_for(&server, &storage);

    let err = manager
        .login(&mint(3_600, "USER"), StorageScope::Durable)
        .await
        .unwrap_err();

    assert!(err.is_authorization());
    assert!(manager.state().is_unauthenticated());
    assert_eq!(
        manager.last_invalidation(),
        Some(InvalidationReason::Unauthorized)
    );
    assert!(storage.is_empty().unwrap());
}

#[tokio::test]
async fn test_unreachable_api_ends_session() {
    let storage = MemoryTokenStorage::new();
    let api = ApiClient::new(ClientConfig::new("http://127.0.0.1:1")).unwrap();
    let manager = SessionManager::new(
        Arc::new(api),
        Arc::new(storage.clone()),
        Arc::new(LocalBus::new()),
        SessionOptions::default(),
    );

    let err = manager
        .login(&mint(3_600, "USER"), StorageScope::Tab)
        .await
        .unwrap_err();

    assert!(!err.is_authorization());
    assert_eq!(
        manager.last_invalidation(),
        Some(InvalidationReason::NetworkFailure)
    );
    assert!(storage.is_empty().unwrap());
}

#[tokio::test]
async fn test_near_expiry_login_calls_refresh_endpoint() {
    let server = MockServer::start().await;
    let renewed = mint(3_600, "USER");
    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 7, "name": "Sari" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accessToken": renewed })))
        .expect(1)
        .mount(&server)
        .await;

    let storage = MemoryTokenStorage::new();
    let (manager, api) = manager_for(&server, &storage);
    api.restore_refresh_cookies("refreshToken=r1").unwrap();

    let session = manager
        .login(&mint(30, "USER"), StorageScope::Tab)
        .await
        .unwrap();

    assert_eq!(session.token(), renewed);
    assert_eq!(
        storage.get(StorageScope::Tab).unwrap().as_deref(),
        Some(renewed.as_str())
    );
}

#[tokio::test]
async fn test_refresh_cookie_carries_over_to_next_process() {
    let server = MockServer::start().await;
    let renewed = mint(3_600, "USER");
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "refreshToken=r1; Path=/; HttpOnly")
                .set_body_json(json!({ "accessToken": mint(7_200, "USER") })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 7, "name": "Sari" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .and(header("cookie", "refreshToken=r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accessToken": renewed })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("token.json");
    let cookie_file = RefreshCookieFile::beside(&token_path);
    let new_process = |storage: &FileTokenStorage| {
        let api = ApiClient::new(ClientConfig::new(server.uri())).unwrap();
        let manager = SessionManager::new(
            Arc::new(api.clone()),
            Arc::new(storage.clone()),
            Arc::new(LocalBus::new()),
            SessionOptions::default(),
        );
        (manager, api)
    };

    // First run: log in with "remember me" and keep the cookie.
    let storage = FileTokenStorage::new(&token_path);
    let (first, first_api) = new_process(&storage);
    let credentials = Credentials {
        email: "sari@example.com".into(),
        password: "rahasia1".into(),
        remember_me: true,
    };
    first.login_with_credentials(&credentials).await.unwrap();
    cookie_file.save(&first_api.refresh_cookies().unwrap()).unwrap();
    first.shutdown();

    // A run without the cookie keeps the stored token instead of logging out.
    let storage = FileTokenStorage::new(&token_path);
    let (bare, _) = new_process(&storage);
    assert!(bare.start().await.is_authenticated());
    let err = bare.refresh_now().await.unwrap_err();
    assert!(matches!(err, SessionError::NoRefreshCredential));
    assert!(token_path.exists());
    bare.shutdown();

    // A run that restores the cookie can refresh.
    let storage = FileTokenStorage::new(&token_path);
    let (second, second_api) = new_process(&storage);
    second_api
        .restore_refresh_cookies(&cookie_file.load().unwrap().unwrap())
        .unwrap();
    assert!(second.start().await.is_authenticated());
    let session = second.refresh_now().await.unwrap();

    assert_eq!(session.token(), renewed);
    assert_eq!(
        storage.get(StorageScope::Durable).unwrap().as_deref(),
        Some(renewed.as_str())
    );
}
