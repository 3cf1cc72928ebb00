//! Integration tests for the API server, wired with in-memory adapters.

use std::sync::{Arc, OnceLock};

use api::middleware::REQUEST_ID_HEADER;
use api::{AppState, HttpSettings};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use common::UserId;
use domain::memory::{
    InMemoryBookRepository, InMemoryCartRepository, InMemoryEmailClient, InMemoryHashHandler,
    InMemoryOrderRepository, InMemoryPaymentClient, InMemoryStorageClient, InMemoryTokenHandler,
    InMemoryUserRepository, SequentialIdGenerator, StaticPasswordGenerator,
};
use domain::ports::{TokenClaims, TokenHandler};
use domain::{Authenticator, Catalog, Shop};
use integrations::webhook::{SIGNATURE_HEADER, sign};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    router: Router,
    tokens: Arc<InMemoryTokenHandler>,
    payments: Arc<InMemoryPaymentClient>,
}

impl TestApp {
    fn new() -> Self {
        Self::with(HttpSettings::default(), None)
    }

    fn with(settings: HttpSettings, webhook_secret: Option<&str>) -> Self {
        let tokens = Arc::new(InMemoryTokenHandler::new());
        let payments = Arc::new(InMemoryPaymentClient::new());

        let authenticator = Arc::new(Authenticator::new(
            Arc::new(InMemoryUserRepository::new()),
            tokens.clone(),
            Arc::new(InMemoryHashHandler::new()),
            Arc::new(InMemoryEmailClient::new()),
            Arc::new(SequentialIdGenerator::new("user")),
            Arc::new(StaticPasswordGenerator::new("n3wpass")),
        ));
        let catalog = Arc::new(Catalog::new(
            Arc::new(InMemoryBookRepository::new()),
            Arc::new(InMemoryStorageClient::new()),
            Arc::new(SequentialIdGenerator::new("book")),
        ));
        let shop = Arc::new(Shop::new(
            catalog.clone(),
            Arc::new(InMemoryCartRepository::new()),
            Arc::new(InMemoryOrderRepository::new()),
            payments.clone(),
            Arc::new(SequentialIdGenerator::new("order")),
        ));

        let state = Arc::new(AppState {
            authenticator,
            catalog,
            shop,
            webhook_secret: webhook_secret.map(str::to_string),
        });
        Self {
            router: api::create_app(state, metrics_handle(), settings),
            tokens,
            payments,
        }
    }

    async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.unwrap()
    }

    async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.send(req).await;
        let status = response.status();
        (status, read_json(response).await)
    }

    async fn register(&self, email: &str) -> (StatusCode, Value) {
        self.call(
            "POST",
            "/api/v1/register",
            None,
            Some(json!({
                "firstName": "Raphael",
                "lastName": "Collin",
                "email": email,
                "password": "password",
                "passwordConfirmation": "password"
            })),
        )
        .await
    }

    async fn customer_token(&self, email: &str) -> String {
        let (status, body) = self.register(email).await;
        assert_eq!(status, StatusCode::CREATED);
        body["token"].as_str().unwrap().to_string()
    }

    fn admin_token(&self) -> String {
        self.tokens
            .generate(&TokenClaims {
                id: UserId::new("admin-1"),
                email: "admin@test.com".to_string(),
                full_name: "Ada Admin".to_string(),
                is_admin: true,
            })
            .unwrap()
    }

    async fn create_book(&self, admin: &str) -> String {
        let (status, body) = self
            .call("POST", "/api/v1/books", Some(admin), Some(book_payload()))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    /// Puts `book_id` in the caller's cart and turns the cart into an order.
    async fn place_order(&self, token: &str, book_id: &str) -> Value {
        let (status, _) = self
            .call("POST", &format!("/api/v1/cart/items/{book_id}"), Some(token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, order) = self.call("POST", "/api/v1/orders", Some(token), None).await;
        assert_eq!(status, StatusCode::CREATED, "{order}");
        order
    }

    async fn webhook(&self, payload: &[u8], signature: Option<String>) -> StatusCode {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/stripe/webhook")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        let response = self
            .send(builder.body(Body::from(payload.to_vec())).unwrap())
            .await;
        response.status()
    }
}

fn book_payload() -> Value {
    json!({
        "title": "The Rust Programming Language",
        "description": "An introduction to Rust",
        "authorName": "Steve Klabnik",
        "contentId": "content-trpl",
        "price": 3999,
        "releaseDate": "2023-02-28T00:00:00Z",
        "images": [{ "id": "cover-trpl", "description": "cover" }]
    })
}

fn succeeded_event(intent_id: &str, order_id: &str) -> Vec<u8> {
    json!({
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": intent_id, "metadata": { "orderID": order_id } } }
    })
    .to_string()
    .into_bytes()
}

async fn read_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    }
}

mod auth {
    use super::*;

    #[tokio::test]
    async fn test_register_then_duplicate_conflicts() {
        let app = TestApp::new();

        let (status, body) = app.register("raphael@test.com").await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

        let (status, body) = app.register("raphael@test.com").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["message"].as_str().unwrap().contains("email"));
    }

    #[tokio::test]
    async fn test_login_with_wrong_password_is_unauthorized() {
        let app = TestApp::new();
        app.customer_token("raphael@test.com").await;

        let (status, _) = app
            .call(
                "POST",
                "/api/v1/login",
                None,
                Some(json!({ "email": "raphael@test.com", "password": "wrongpass" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = app
            .call(
                "POST",
                "/api/v1/login",
                None,
                Some(json!({ "email": "raphael@test.com", "password": "password" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].is_string());
    }

    #[tokio::test]
    async fn test_validation_failure_lists_details() {
        let app = TestApp::new();

        let (status, body) = app
            .call(
                "POST",
                "/api/v1/register",
                None,
                Some(json!({
                    "firstName": "",
                    "lastName": "Collin",
                    "email": "not-an-email",
                    "password": "password",
                    "passwordConfirmation": "different"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
        assert!(!body["details"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = TestApp::new();
        let response = app
            .send(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/login")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_password_reset_returns_no_content() {
        let app = TestApp::new();
        app.customer_token("raphael@test.com").await;

        let (status, _) = app
            .call(
                "POST",
                "/api/v1/password-reset",
                None,
                Some(json!({ "email": "raphael@test.com" })),
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app
            .call(
                "POST",
                "/api/v1/login",
                None,
                Some(json!({ "email": "raphael@test.com", "password": "n3wpass" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_route_without_token_is_unauthorized() {
        let app = TestApp::new();

        let (status, _) = app.call("GET", "/api/v1/books", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .call("GET", "/api/v1/books", Some("forged-token"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

mod catalog {
    use super::*;

    #[tokio::test]
    async fn test_only_admins_create_books() {
        let app = TestApp::new();
        let customer = app.customer_token("raphael@test.com").await;

        let (status, _) = app
            .call("POST", "/api/v1/books", Some(&customer), Some(book_payload()))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let admin = app.admin_token();
        let (status, body) = app
            .call("POST", "/api/v1/books", Some(&admin), Some(book_payload()))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["title"], "The Rust Programming Language");
        assert_eq!(body["mainImageId"], "cover-trpl");
    }

    #[tokio::test]
    async fn test_customers_browse_books() {
        let app = TestApp::new();
        let admin = app.admin_token();
        let book_id = app.create_book(&admin).await;
        let customer = app.customer_token("raphael@test.com").await;

        let (status, body) = app
            .call("GET", "/api/v1/books?title=Rust&perPage=5", Some(&customer), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalBooks"], 1);
        assert_eq!(body["perPage"], 5);
        assert_eq!(body["books"][0]["id"], book_id.as_str());

        let (status, body) = app
            .call("GET", &format!("/api/v1/books/{book_id}"), Some(&customer), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["authorName"], "Steve Klabnik");

        let (status, _) = app
            .call("GET", "/api/v1/books/missing", Some(&customer), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_updates_and_deletes_book() {
        let app = TestApp::new();
        let admin = app.admin_token();
        let book_id = app.create_book(&admin).await;
        let uri = format!("/api/v1/books/{book_id}");

        let (status, _) = app
            .call("PATCH", &uri, Some(&admin), Some(json!({ "price": 2999 })))
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = app.call("GET", &uri, Some(&admin), None).await;
        assert_eq!(body["price"], 2999);
        assert_eq!(body["title"], "The Rust Programming Language");

        let (status, _) = app.call("DELETE", &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app.call("GET", &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_presign_url_for_upload() {
        let app = TestApp::new();
        let admin = app.admin_token();

        let (status, body) = app.call("POST", "/api/v1/presign-url", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        let id = body["id"].as_str().unwrap();
        assert!(body["url"].as_str().unwrap().ends_with(&format!("/put/{id}")));
    }
}

mod shop {
    use super::*;

    #[tokio::test]
    async fn test_purchase_flow_ends_with_download_url() {
        let app = TestApp::new();
        let admin = app.admin_token();
        let book_id = app.create_book(&admin).await;
        let customer = app.customer_token("raphael@test.com").await;

        let order = app.place_order(&customer, &book_id).await;
        assert_eq!(order["status"], "PENDING");
        assert_eq!(order["totalPrice"], 3999);
        let order_id = order["id"].as_str().unwrap();
        let intent_id = order["paymentIntentId"].as_str().unwrap();
        assert_eq!(app.payments.created().await, 1);

        let (_, cart) = app.call("GET", "/api/v1/active-cart", Some(&customer), None).await;
        assert!(cart["items"].as_array().unwrap().is_empty());

        let status = app
            .webhook(&succeeded_event(intent_id, order_id), None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, order) = app
            .call("GET", &format!("/api/v1/orders/{order_id}"), Some(&customer), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(order["status"], "PAID");

        let (status, body) = app
            .call(
                "GET",
                &format!("/api/v1/orders/{order_id}/items/{book_id}/download"),
                Some(&customer),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["url"].as_str().unwrap().starts_with("https://storage.test/get/"));
    }

    #[tokio::test]
    async fn test_download_of_unpaid_order_requires_payment() {
        let app = TestApp::new();
        let admin = app.admin_token();
        let book_id = app.create_book(&admin).await;
        let customer = app.customer_token("raphael@test.com").await;
        let order = app.place_order(&customer, &book_id).await;

        let (status, _) = app
            .call(
                "GET",
                &format!("/api/v1/orders/{}/items/{book_id}/download", order["id"].as_str().unwrap()),
                Some(&customer),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn test_other_customers_cannot_see_order() {
        let app = TestApp::new();
        let admin = app.admin_token();
        let book_id = app.create_book(&admin).await;
        let owner = app.customer_token("owner@test.com").await;
        let stranger = app.customer_token("stranger@test.com").await;
        let order = app.place_order(&owner, &book_id).await;
        let uri = format!("/api/v1/orders/{}", order["id"].as_str().unwrap());

        let (status, _) = app.call("GET", &uri, Some(&stranger), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app.call("GET", &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, listing) = app.call("GET", "/api/v1/orders", Some(&stranger), None).await;
        assert_eq!(listing["totalOrders"], 0);
    }

    #[tokio::test]
    async fn test_cart_rejects_duplicate_and_missing_items() {
        let app = TestApp::new();
        let admin = app.admin_token();
        let book_id = app.create_book(&admin).await;
        let customer = app.customer_token("raphael@test.com").await;
        let uri = format!("/api/v1/cart/items/{book_id}");

        let (status, cart) = app.call("POST", &uri, Some(&customer), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cart["totalPrice"], 3999);

        let (status, _) = app.call("POST", &uri, Some(&customer), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, cart) = app.call("DELETE", &uri, Some(&customer), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cart["totalPrice"], 0);

        let (status, _) = app.call("DELETE", &uri, Some(&customer), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_order_from_empty_cart_is_rejected() {
        let app = TestApp::new();
        let customer = app.customer_token("raphael@test.com").await;

        let (status, _) = app.call("POST", "/api/v1/orders", Some(&customer), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(app.payments.created().await, 0);
    }
}

mod webhook {
    use super::*;

    const SECRET: &str = "whsec_test";

    #[tokio::test]
    async fn test_signed_webhook_is_verified() {
        let app = TestApp::with(HttpSettings::default(), Some(SECRET));
        let admin = app.admin_token();
        let book_id = app.create_book(&admin).await;
        let customer = app.customer_token("raphael@test.com").await;
        let order = app.place_order(&customer, &book_id).await;
        let payload = succeeded_event(
            order["paymentIntentId"].as_str().unwrap(),
            order["id"].as_str().unwrap(),
        );

        assert_eq!(app.webhook(&payload, None).await, StatusCode::BAD_REQUEST);

        let forged = sign(&payload, "whsec_other", chrono::Utc::now().timestamp()).unwrap();
        assert_eq!(
            app.webhook(&payload, Some(forged)).await,
            StatusCode::BAD_REQUEST
        );

        let signature = sign(&payload, SECRET, chrono::Utc::now().timestamp()).unwrap();
        assert_eq!(app.webhook(&payload, Some(signature)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_other_events_are_acknowledged() {
        let app = TestApp::new();
        let payload = json!({
            "type": "payment_intent.created",
            "data": { "object": { "id": "pi_9", "metadata": {} } }
        })
        .to_string();

        assert_eq!(app.webhook(payload.as_bytes(), None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let app = TestApp::new();
        let status = app.webhook(&succeeded_event("pi_9", "missing"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

mod transport {
    use super::*;

    #[tokio::test]
    async fn test_healthcheck() {
        let app = TestApp::new();
        let (status, body) = app.call("GET", "/api/v1/healthcheck", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
    }

    #[tokio::test]
    async fn test_metrics_endpoint_renders_prometheus_text() {
        let app = TestApp::new();
        app.call("GET", "/api/v1/healthcheck", None, None).await;

        let response = app
            .send(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()["content-type"].to_str().unwrap();
        assert!(content_type.starts_with("text/plain"));
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(String::from_utf8_lossy(&body).contains("http_requests_total"));
    }

    #[tokio::test]
    async fn test_request_id_is_echoed_or_generated() {
        let app = TestApp::new();

        let response = app
            .send(
                Request::builder()
                    .uri("/api/v1/healthcheck")
                    .header(&REQUEST_ID_HEADER, "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.headers()[&REQUEST_ID_HEADER], "req-42");

        let response = app
            .send(
                Request::builder()
                    .uri("/api/v1/healthcheck")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        let generated = response.headers()[&REQUEST_ID_HEADER].to_str().unwrap();
        assert!(uuid::Uuid::parse_str(generated).is_ok());
    }

    #[tokio::test]
    async fn test_rate_limit_returns_retry_after() {
        let settings = HttpSettings {
            rate_limit_per_hour: 2,
            ..HttpSettings::default()
        };
        let app = TestApp::with(settings, None);
        let request = || {
            Request::builder()
                .uri("/api/v1/healthcheck")
                .header("x-forwarded-for", "203.0.113.7")
                .body(Body::empty())
                .unwrap()
        };

        assert_eq!(app.send(request()).await.status(), StatusCode::OK);
        assert_eq!(app.send(request()).await.status(), StatusCode::OK);

        let response = app.send(request()).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));

        let other = Request::builder()
            .uri("/api/v1/healthcheck")
            .header("x-forwarded-for", "198.51.100.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.send(other).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let settings = HttpSettings {
            body_limit_bytes: 64,
            ..HttpSettings::default()
        };
        let app = TestApp::with(settings, None);
        let payload = format!(r#"{{"email":"{}"}}"#, "a".repeat(200));
        let response = app
            .send(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/login")
                    .header("content-type", "application/json")
                    .header("content-length", payload.len())
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
