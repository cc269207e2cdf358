#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use base64::Engine;
use chrono::Utc;
use pharmacy_api::{
    auth::hash_password,
    build_router,
    config::AppConfig,
    db,
    entities::{user_account, UserRole},
    events, AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "Tablet-Dose-42";

/// Helper harness for spinning up the full router backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    admin_token: String,
    _event_task: tokio::task::JoinHandle<()>,
}

/// A registered customer and its session
pub struct Customer {
    pub token: String,
    pub customer_id: Uuid,
    pub email: String,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // Every in-memory connection is its own database; keep exactly one.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.auto_migrate = true;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_sender, event_rx) = events::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(db_arc.clone(), cfg, Arc::new(event_sender));
        let router = build_router(state.clone());

        let admin_email = "admin@pharmacy.test";
        let now = Utc::now();
        user_account::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(admin_email.to_string()),
            password_hash: Set(hash_password(PASSWORD).expect("hash admin password")),
            role: Set(UserRole::Admin),
            is_active: Set(true),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*db_arc)
        .await
        .expect("insert admin account");

        let mut app = Self {
            router,
            state,
            admin_token: String::new(),
            _event_task: event_task,
        };
        app.admin_token = app.login(admin_email, PASSWORD).await;
        app
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        self.request_with_headers(method, uri, body, token, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for admin requests.
    pub async fn as_admin(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(self.admin_token())).await
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/api/auth/login",
                Some(json!({ "email": email, "password": password })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "login for {email}");
        let body = response_json(response).await;
        body["data"]["token"]
            .as_str()
            .expect("session token")
            .to_string()
    }

    pub async fn register_customer(&self, email: &str) -> Customer {
        let response = self
            .request(
                Method::POST,
                "/api/auth/register",
                Some(json!({
                    "email": email,
                    "password": PASSWORD,
                    "first_name": "Test",
                    "last_name": "Customer",
                    "address": "12 Elm Street"
                })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "register {email}");
        let body = response_json(response).await;
        Customer {
            token: body["data"]["token"]
                .as_str()
                .expect("session token")
                .to_string(),
            customer_id: uuid_at(&body["data"]["user"]["customer_id"]),
            email: email.to_string(),
        }
    }

    pub async fn create_branch(&self, name: &str) -> Uuid {
        let response = self
            .as_admin(
                Method::POST,
                "/api/branches",
                Some(json!({ "name": name, "address": "1 Main Street" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "create branch {name}");
        uuid_at(&response_json(response).await["data"]["id"])
    }

    pub async fn create_product(
        &self,
        sku: &str,
        name: &str,
        price: &str,
        requires_prescription: bool,
    ) -> Uuid {
        let response = self
            .as_admin(
                Method::POST,
                "/api/products",
                Some(json!({
                    "sku": sku,
                    "name": name,
                    "category": "general",
                    "manufacturer": "Acme Pharma",
                    "price": price,
                    "requires_prescription": requires_prescription
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "create product {sku}");
        uuid_at(&response_json(response).await["data"]["id"])
    }

    /// Sets the stock of a product at a branch and returns the inventory row id
    pub async fn set_stock(&self, branch_id: Uuid, product_id: Uuid, quantity: i32) -> Uuid {
        let response = self
            .as_admin(
                Method::PUT,
                "/api/inventory",
                Some(json!({
                    "branch_id": branch_id,
                    "product_id": product_id,
                    "quantity": quantity,
                    "reorder_level": 2
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "set stock");
        uuid_at(&response_json(response).await["data"]["id"])
    }

    /// Quantity at a branch as reported by the inventory listing
    pub async fn stock_of(&self, branch_id: Uuid, product_id: Uuid) -> i64 {
        let response = self
            .as_admin(
                Method::GET,
                &format!("/api/inventory?branch_id={branch_id}&product_id={product_id}"),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        body["data"]["items"][0]["quantity"]
            .as_i64()
            .expect("inventory quantity")
    }

    pub async fn add_to_cart(&self, customer: &Customer, product_id: Uuid, quantity: i32) -> Response {
        self.request(
            Method::POST,
            "/api/cart",
            Some(json!({ "product_id": product_id, "quantity": quantity })),
            Some(&customer.token),
        )
        .await
    }

    pub async fn checkout(&self, customer: &Customer, branch_id: Uuid) -> Response {
        self.request(
            Method::POST,
            "/api/orders/checkout",
            Some(json!({ "branch_id": branch_id, "delivery_address": "12 Elm Street" })),
            Some(&customer.token),
        )
        .await
    }

    /// Uploads a prescription for `product_id` and has the admin approve it
    pub async fn approve_prescription_for(&self, customer: &Customer, product_id: Uuid) -> Uuid {
        let response = self
            .request(
                Method::POST,
                "/api/prescriptions",
                Some(json!({
                    "product_id": product_id,
                    "doctor_name": "Dr. Grey",
                    "file_name": "rx.pdf",
                    "content_type": "application/pdf",
                    "content_base64": encode_document(b"%PDF-1.4 prescription"),
                })),
                Some(&customer.token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "upload prescription");
        let id = uuid_at(&response_json(response).await["data"]["id"]);

        let response = self
            .as_admin(
                Method::POST,
                &format!("/api/prescriptions/{id}/review"),
                Some(json!({ "decision": "approved" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "approve prescription");
        id
    }

    /// Places a paid order for one product and returns the order id
    pub async fn paid_order(
        &self,
        customer: &Customer,
        branch_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Value {
        let response = self.add_to_cart(customer, product_id, quantity).await;
        assert_eq!(response.status(), StatusCode::OK, "add to cart");

        let response = self.checkout(customer, branch_id).await;
        assert_eq!(response.status(), StatusCode::CREATED, "checkout");
        let order = response_json(response).await["data"].clone();
        let order_id = order["id"].as_str().expect("order id").to_string();

        let response = self
            .request(
                Method::POST,
                &format!("/api/orders/{order_id}/payments"),
                Some(json!({ "method": "cash", "amount": order["total_amount"] })),
                Some(&customer.token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "record payment");
        order
    }

    /// Moves a confirmed order through to delivered
    pub async fn deliver(&self, order_id: &str) {
        for body in [
            json!({ "status": "processing" }),
            json!({ "status": "out_for_delivery", "tracking_number": "TRK-1" }),
            json!({ "status": "delivered" }),
        ] {
            let response = self
                .as_admin(
                    Method::PUT,
                    &format!("/api/orders/{order_id}/status"),
                    Some(body.clone()),
                )
                .await;
            assert_eq!(response.status(), StatusCode::OK, "status update {body}");
        }
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

pub async fn response_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn uuid_at(value: &Value) -> Uuid {
    value
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(|| panic!("expected uuid, got {value}"))
}

/// Decimals serialize as strings; accept numbers too
pub fn decimal_at(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("expected decimal, got {other}"),
    }
}

pub fn encode_document(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
