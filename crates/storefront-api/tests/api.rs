//! HTTP-level tests for the storefront API client against a mock server.

use serde_json::json;
use storefront_api::{ApiClient, ApiError, ClientConfig, ErrorCategory};
use storefront_core::{
    Credentials, ListQuery, NewProduct, NewReview, Price, ResourceId, ServerStatus, SortOrder,
};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(ClientConfig::new(server.uri())).unwrap()
}

fn product_json(id: i64, title: &str, category: i64) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "price": 15000,
        "stock": 3,
        "category": { "id": category, "name": "Minuman" }
    })
}

#[tokio::test]
async fn test_product_list_sends_only_set_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(query_param("search", "kopi"))
        .and(query_param("minPrice", "10000"))
        .and(query_param("sortBy", "price"))
        .and(query_param("order", "asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            product_json(1, "Kopi Arabika", 2),
            product_json(2, "Kopi Robusta", 2),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let query = ListQuery::new()
        .search("  kopi ")
        .price_range(Some(Price::from_rupiah(10_000)), None)
        .sort("price", SortOrder::Asc);
    let page = client_for(&server).products().list(&query).await.unwrap();

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total_count, 2);
    assert_eq!(page.items[0].title, "Kopi Arabika");
}

#[tokio::test]
async fn test_article_envelope_gives_total_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/articles"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "articles": [
                { "id": 6, "title": "Resep", "content": "<p>..</p>", "published": true }
            ],
            "totalCount": 11
        })))
        .mount(&server)
        .await;

    let page = client_for(&server)
        .articles()
        .list(&ListQuery::new().page(2, 5))
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total_pages(5), 3);
}

#[tokio::test]
async fn test_related_excludes_the_product_itself() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products/category"))
        .and(query_param("categoryId", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            product_json(1, "Kopi Arabika", 2),
            product_json(2, "Kopi Robusta", 2),
            product_json(3, "Kopi Luwak", 2),
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let product: storefront_core::Product =
        serde_json::from_value(product_json(1, "Kopi Arabika", 2)).unwrap();
    let related = client.products().related(&product, 5).await.unwrap();

    let ids: Vec<&str> = related.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["2", "3"]);
}

#[tokio::test]
async fn test_protected_call_sends_bearer_and_maps_401() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/profile"))
        .and(header("authorization", "Bearer dead-token"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Token expired" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .with_token("dead-token")
        .profile()
        .get()
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Authorization);
    assert!(err.to_string().contains("Token expired"));
}

#[tokio::test]
async fn test_missing_product_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products/99"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "Product not found" })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .products()
        .get(&ResourceId::from(99))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.category(), ErrorCategory::NotFound);
}

#[tokio::test]
async fn test_invalid_product_never_reaches_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/products"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let product = NewProduct {
        title: String::new(),
        description: "tanpa judul".into(),
        price: Price::from_rupiah(1_000),
        category_id: ResourceId::from(1),
        stock: 1,
        image: None,
    };
    let err = client_for(&server)
        .with_token("admin")
        .products()
        .create(&product)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Validation(ref v) if v.field() == "title"));
}

#[tokio::test]
async fn test_review_create_posts_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/reviews"))
        .and(header("authorization", "Bearer shopper"))
        .and(body_json(json!({ "rating": 5, "comment": "Mantap", "productId": "7" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let review = NewReview {
        rating: 5,
        comment: "Mantap".into(),
        product_id: ResourceId::from(7),
    };
    client_for(&server)
        .with_token("shopper")
        .reviews()
        .create(&review)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_wishlist_add_uses_product_id_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/wishlist/add/12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .with_token("shopper")
        .wishlist()
        .add(&ResourceId::from(12))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_login_then_refresh_reuses_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "email": "sari@example.com", "password": "rahasia1", "rememberMe": true })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "refreshToken=r1; Path=/; HttpOnly")
                .set_body_json(json!({ "accessToken": "first" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .and(header("cookie", "refreshToken=r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "second" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let credentials = Credentials {
        email: "sari@example.com".into(),
        password: "rahasia1".into(),
        remember_me: true,
    };

    let login = client.auth().login(&credentials).await.unwrap();
    assert_eq!(login.access_token, "first");

    let refreshed = client.auth().refresh().await.unwrap();
    assert_eq!(refreshed.access_token, "second");
}

#[tokio::test]
async fn test_saved_refresh_cookie_works_in_new_client() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "refreshToken=r1; Path=/; HttpOnly")
                .set_body_json(json!({ "accessToken": "first" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .and(header("cookie", "refreshToken=r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "second" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "no refresh token" })))
        .mount(&server)
        .await;

    let credentials = Credentials {
        email: "sari@example.com".into(),
        password: "rahasia1".into(),
        remember_me: true,
    };
    let first = client_for(&server);
    first.auth().login(&credentials).await.unwrap();
    let saved = first.refresh_cookies().unwrap();

    // A fresh client starts with an empty jar.
    let bare = client_for(&server);
    assert_eq!(bare.refresh_cookies(), None);
    let err = bare.auth().refresh().await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Authorization);

    let restored = client_for(&server);
    restored.restore_refresh_cookies(&saved).unwrap();
    let refreshed = restored.auth().refresh().await.unwrap();
    assert_eq!(refreshed.access_token, "second");
}

#[tokio::test]
async fn test_status_reports_online_and_offline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "online" })))
        .mount(&server)
        .await;
    assert_eq!(client_for(&server).status().await, ServerStatus::Online);

    let failing = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&failing)
        .await;
    assert_eq!(client_for(&failing).status().await, ServerStatus::Offline);
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let client = ApiClient::new(ClientConfig::new("http://127.0.0.1:1")).unwrap();
    let err = client.categories().list().await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Network);
    assert_eq!(client.status().await, ServerStatus::Offline);
}

#[tokio::test]
async fn test_server_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/categories/4"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "Category still has products" })),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .with_token("admin")
        .categories()
        .delete(&ResourceId::from(4))
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Server);
    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("Category still has products"));
}
