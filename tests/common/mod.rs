#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use pos_backoffice::{
    auth::NewUser,
    build_router,
    config::AppConfig,
    db,
    entities::{customer, product, store, supplier, user::Role},
    AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "correct-horse-battery";

/// Application backed by a throwaway SQLite file, with one store and two
/// logged-in users (a manager and a cashier).
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub store_id: Uuid,
    pub manager_token: String,
    pub cashier_token: String,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Build the app after letting the caller tweak configuration.
    pub async fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("pos_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        tweak(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = build_router(state.clone()).expect("router builds");

        let store_id = seed_store(&state, "Corner Shop").await;
        seed_user(&state, Some(store_id), "manager@shop.test", Role::Manager).await;
        seed_user(&state, Some(store_id), "cashier@shop.test", Role::Cashier).await;

        let mut app = Self {
            router,
            state,
            store_id,
            manager_token: String::new(),
            cashier_token: String::new(),
            _dir: dir,
        };
        app.manager_token = app.login("manager@shop.test", PASSWORD).await;
        app.cashier_token = app.login("cashier@shop.test", PASSWORD).await;
        app
    }

    /// Log in and return the session token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/api/v1/auth/login",
                Some(serde_json::json!({ "email": email, "password": password })),
                None,
            )
            .await;
        assert_eq!(response.status(), 200, "login for {} failed", email);
        let body = body_json(response).await;
        body["data"]["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
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

    pub async fn as_manager(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(&self.manager_token)).await
    }

    pub async fn as_cashier(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(&self.cashier_token)).await
    }

    pub async fn seed_supplier(&self, name: &str) -> supplier::Model {
        let now = Utc::now();
        supplier::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(self.store_id),
            name: Set(name.to_string()),
            contact_name: Set(None),
            email: Set(None),
            phone: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed supplier")
    }

    /// Product with explicit stock thresholds.
    pub async fn seed_product(
        &self,
        sku: &str,
        supplier_id: Option<Uuid>,
        stock: i32,
        reorder_point: i32,
        safety_stock: i32,
        cost_price: Decimal,
    ) -> product::Model {
        let now = Utc::now();
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(self.store_id),
            category_id: Set(None),
            supplier_id: Set(supplier_id),
            sku: Set(sku.to_string()),
            name: Set(format!("Product {}", sku)),
            description: Set(None),
            price: Set(cost_price * Decimal::from(2)),
            cost_price: Set(cost_price),
            stock: Set(stock),
            reorder_point: Set(reorder_point),
            safety_stock: Set(safety_stock),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product")
    }

    pub async fn seed_customer(&self, name: &str, debt: Decimal) -> customer::Model {
        let now = Utc::now();
        customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(self.store_id),
            name: Set(name.to_string()),
            email: Set(None),
            phone: Set(None),
            debt: Set(debt),
            credit_limit: Set(Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed customer")
    }
}

pub async fn seed_store(state: &AppState, name: &str) -> Uuid {
    store::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        currency: Set("USD".to_string()),
        created_at: Set(Utc::now()),
    }
    .insert(&*state.db)
    .await
    .expect("seed store")
    .id
}

pub async fn seed_user(state: &AppState, store_id: Option<Uuid>, email: &str, role: Role) -> Uuid {
    state
        .services
        .auth
        .create_user(NewUser {
            store_id,
            email: email.to_string(),
            name: email.split('@').next().unwrap_or(email).to_string(),
            password: PASSWORD.to_string(),
            role,
        })
        .await
        .expect("seed user")
        .id
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is json")
}

pub fn dec(value: &str) -> Decimal {
    value.parse().expect("valid decimal literal")
}

/// Decimal from a JSON money field, regardless of stored scale.
pub fn money(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("expected money value, got {}", other),
    }
}
