mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, dec, money, TestApp};
use serde_json::json;

#[tokio::test]
async fn product_lifecycle_with_category_and_supplier() {
    let app = TestApp::new().await;

    let category = app
        .as_manager(
            Method::POST,
            "/api/v1/categories",
            Some(json!({ "name": "Beverages" })),
        )
        .await;
    assert_eq!(category.status(), StatusCode::CREATED);
    let category_id = body_json(category).await["data"]["id"].clone();

    let supplier = app
        .as_manager(
            Method::POST,
            "/api/v1/suppliers",
            Some(json!({ "name": "Fizz Wholesale", "email": "orders@fizz.test" })),
        )
        .await;
    assert_eq!(supplier.status(), StatusCode::CREATED);
    let supplier_id = body_json(supplier).await["data"]["id"].clone();

    let created = app
        .as_manager(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "sku": "COLA-330",
                "name": "Cola 330ml",
                "price": "1.20",
                "costPrice": 0.55,
                "stock": 24,
                "reorderPoint": 12,
                "safetyStock": 6,
                "categoryId": category_id,
                "supplierId": supplier_id,
            })),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let product = body_json(created).await["data"].clone();
    let product_id = product["id"].as_str().unwrap().to_string();
    assert_eq!(product["stock"], 24);
    assert_eq!(money(&product["costPrice"]), dec("0.55"));

    let duplicate = app
        .as_manager(
            Method::POST,
            "/api/v1/products",
            Some(json!({ "sku": "COLA-330", "name": "Again", "price": 1, "costPrice": 1 })),
        )
        .await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let sold = app
        .as_cashier(
            Method::POST,
            &format!("/api/v1/products/{}/stock", product_id),
            Some(json!({ "delta": -20, "reason": "sales" })),
        )
        .await;
    assert_eq!(sold.status(), StatusCode::OK);
    assert_eq!(body_json(sold).await["data"]["stock"], 4);

    let oversold = app
        .as_cashier(
            Method::POST,
            &format!("/api/v1/products/{}/stock", product_id),
            Some(json!({ "delta": -5 })),
        )
        .await;
    assert_eq!(oversold.status(), StatusCode::BAD_REQUEST);

    let low = body_json(
        app.as_cashier(Method::GET, "/api/v1/products/low-stock", None)
            .await,
    )
    .await;
    let low_items = low["data"].as_array().expect("low stock list");
    assert_eq!(low_items.len(), 1);
    assert_eq!(low_items[0]["sku"], "COLA-330");

    let search = body_json(
        app.as_cashier(Method::GET, "/api/v1/products?search=cola&page=1&limit=10", None)
            .await,
    )
    .await;
    assert_eq!(search["data"]["total"], 1);
    assert_eq!(search["data"]["items"][0]["id"], product_id.as_str());

    let renamed = app
        .as_manager(
            Method::PUT,
            &format!("/api/v1/products/{}", product_id),
            Some(json!({ "name": "Cola Classic 330ml", "price": "1.35" })),
        )
        .await;
    assert_eq!(renamed.status(), StatusCode::OK);
    let renamed = body_json(renamed).await;
    assert_eq!(renamed["data"]["name"], "Cola Classic 330ml");
    assert_eq!(money(&renamed["data"]["price"]), dec("1.35"));

    // Deleting the category keeps the product, uncategorised.
    let removed = app
        .as_manager(
            Method::DELETE,
            &format!("/api/v1/categories/{}", category_id.as_str().unwrap()),
            None,
        )
        .await;
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);
    let fetched = body_json(
        app.as_cashier(Method::GET, &format!("/api/v1/products/{}", product_id), None)
            .await,
    )
    .await;
    assert!(fetched["data"]["categoryId"].is_null());

    let deleted = app
        .as_manager(Method::DELETE, &format!("/api/v1/products/{}", product_id), None)
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    let gone = app
        .as_cashier(Method::GET, &format!("/api/v1/products/{}", product_id), None)
        .await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_products_are_rejected() {
    let app = TestApp::new().await;

    let negative_price = app
        .as_manager(
            Method::POST,
            "/api/v1/products",
            Some(json!({ "sku": "X", "name": "X", "price": -1, "costPrice": 1 })),
        )
        .await;
    assert_eq!(negative_price.status(), StatusCode::BAD_REQUEST);

    let blank_sku = app
        .as_manager(
            Method::POST,
            "/api/v1/products",
            Some(json!({ "sku": "", "name": "X", "price": 1, "costPrice": 1 })),
        )
        .await;
    assert_eq!(blank_sku.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn supplier_changes_need_a_manager() {
    let app = TestApp::new().await;
    let response = app
        .as_cashier(
            Method::POST,
            "/api/v1/suppliers",
            Some(json!({ "name": "Sneaky Supplies" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let listed = app.as_cashier(Method::GET, "/api/v1/suppliers", None).await;
    assert_eq!(listed.status(), StatusCode::OK);
}

#[tokio::test]
async fn supplier_referenced_by_purchase_orders_cannot_be_deleted() {
    let app = TestApp::new().await;
    let supplier = app.seed_supplier("Acme").await;
    app.seed_product("A-1", Some(supplier.id), 0, 5, 0, dec("1.00"))
        .await;

    let generated = app
        .as_manager(Method::POST, "/api/v1/purchase-orders/auto", None)
        .await;
    assert_eq!(generated.status(), StatusCode::OK);

    let response = app
        .as_manager(
            Method::DELETE,
            &format!("/api/v1/suppliers/{}", supplier.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn packages_bundle_store_products() {
    let app = TestApp::new().await;
    let chips = app.seed_product("CHIPS", None, 10, 2, 0, dec("0.80")).await;
    let dip = app.seed_product("DIP", None, 10, 2, 0, dec("1.10")).await;

    let created = app
        .as_manager(
            Method::POST,
            "/api/v1/packages",
            Some(json!({
                "name": "Movie night",
                "price": "3.50",
                "items": [
                    { "productId": chips.id, "quantity": 2 },
                    { "productId": dip.id, "quantity": 1 },
                ],
            })),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let package = body_json(created).await["data"].clone();
    assert_eq!(package["items"].as_array().unwrap().len(), 2);

    let unknown_product = app
        .as_manager(
            Method::POST,
            "/api/v1/packages",
            Some(json!({
                "name": "Broken",
                "price": "1.00",
                "items": [{ "productId": uuid::Uuid::new_v4(), "quantity": 1 }],
            })),
        )
        .await;
    assert_eq!(unknown_product.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn customer_with_debt_cannot_be_deleted() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Kim", dec("12.00")).await;

    let response = app
        .as_manager(
            Method::DELETE,
            &format!("/api/v1/customers/{}", customer.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let settled = app
        .as_cashier(
            Method::POST,
            "/api/v1/customers/credit",
            Some(json!({ "customerId": customer.id, "amount": 12 })),
        )
        .await;
    assert_eq!(settled.status(), StatusCode::OK);

    let response = app
        .as_manager(
            Method::DELETE,
            &format!("/api/v1/customers/{}", customer.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
