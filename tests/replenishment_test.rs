mod common;

use std::collections::HashMap;

use axum::http::{Method, StatusCode};
use common::{body_json, dec, money, seed_user, TestApp, PASSWORD};
use pos_backoffice::entities::{purchase_order, purchase_order_item, user::Role};
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::Value;

const AUTO: &str = "/api/v1/purchase-orders/auto";

fn orders(body: &Value) -> &Vec<Value> {
    body["orders"].as_array().expect("orders array")
}

#[tokio::test]
async fn groups_low_stock_products_by_supplier() {
    let app = TestApp::new().await;
    let acme = app.seed_supplier("Acme").await;
    let bolt = app.seed_supplier("Bolt & Co").await;

    // stock 2, reorder 10, safety 5 -> 13 units
    let a1 = app.seed_product("A-1", Some(acme.id), 2, 10, 5, dec("1.50")).await;
    // stock 10 equals reorder point -> still low, 0 + 3 = 3 units
    let a2 = app.seed_product("A-2", Some(acme.id), 10, 10, 3, dec("4.00")).await;
    let b1 = app.seed_product("B-1", Some(bolt.id), 0, 4, 0, dec("2.25")).await;
    // above reorder point
    app.seed_product("A-3", Some(acme.id), 50, 10, 5, dec("9.99")).await;
    // no supplier
    app.seed_product("N-1", None, 0, 10, 5, dec("1.00")).await;

    let response = app.as_manager(Method::POST, AUTO, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Created 2 purchase order(s)");
    assert!(body.get("skipped").is_none());

    let by_supplier: HashMap<String, &Value> = orders(&body)
        .iter()
        .map(|order| (order["supplierId"].as_str().unwrap().to_string(), order))
        .collect();
    assert_eq!(by_supplier.len(), 2);

    let acme_order = by_supplier[&acme.id.to_string()];
    assert_eq!(acme_order["status"], "DRAFT");
    assert_eq!(money(&acme_order["totalAmount"]), dec("31.50"));
    assert!(acme_order["poNumber"].as_str().unwrap().starts_with("PO-"));
    let quantities: HashMap<String, i64> = acme_order["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| {
            (
                item["productId"].as_str().unwrap().to_string(),
                item["quantity"].as_i64().unwrap(),
            )
        })
        .collect();
    assert_eq!(quantities.len(), 2);
    assert_eq!(quantities[&a1.id.to_string()], 13);
    assert_eq!(quantities[&a2.id.to_string()], 3);

    let bolt_order = by_supplier[&bolt.id.to_string()];
    let bolt_items = bolt_order["items"].as_array().unwrap();
    assert_eq!(bolt_items.len(), 1);
    assert_eq!(bolt_items[0]["productId"], b1.id.to_string());
    assert_eq!(bolt_items[0]["quantity"], 4);
    assert_eq!(money(&bolt_order["totalAmount"]), dec("9.00"));

    let stored = purchase_order::Entity::find()
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(stored, 2);
    let lines = purchase_order_item::Entity::find()
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(lines, 3);
}

#[tokio::test]
async fn nothing_to_order_returns_message_and_no_orders() {
    let app = TestApp::new().await;
    let acme = app.seed_supplier("Acme").await;
    app.seed_product("A-1", Some(acme.id), 40, 10, 5, dec("1.00")).await;

    let response = app.as_manager(Method::POST, AUTO, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(orders(&body).is_empty());
    assert!(body["message"].as_str().unwrap().contains("no purchase orders created"));
}

#[tokio::test]
async fn non_positive_quantities_are_skipped_and_reported() {
    let app = TestApp::new().await;
    let acme = app.seed_supplier("Acme").await;
    // low stock but reorder - stock + safety = 5 - 5 - 2 < 0
    let odd = app.seed_product("ODD", Some(acme.id), 5, 5, -2, dec("1.00")).await;

    let response = app.as_manager(Method::POST, AUTO, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(orders(&body).is_empty());
    let skipped = body["skipped"].as_array().expect("skipped list");
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0]["productId"], odd.id.to_string());
    assert_eq!(skipped[0]["computedQuantity"], -2);
    assert_eq!(skipped[0]["reason"], "non_positive_quantity");
}

#[tokio::test]
async fn repeated_runs_create_independent_drafts() {
    let app = TestApp::new().await;
    let acme = app.seed_supplier("Acme").await;
    app.seed_product("A-1", Some(acme.id), 0, 3, 0, dec("2.00")).await;

    let first = body_json(app.as_manager(Method::POST, AUTO, None).await).await;
    let second = body_json(app.as_manager(Method::POST, AUTO, None).await).await;

    assert_eq!(orders(&first).len(), 1);
    assert_eq!(orders(&second).len(), 1);
    assert_ne!(orders(&first)[0]["poNumber"], orders(&second)[0]["poNumber"]);
    let stored = purchase_order::Entity::find()
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(stored, 2);
}

#[tokio::test]
async fn cashiers_may_not_generate_orders() {
    let app = TestApp::new().await;
    let response = app.as_cashier(Method::POST, AUTO, None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn session_without_store_is_rejected() {
    let app = TestApp::new().await;
    seed_user(&app.state, None, "admin@shop.test", Role::Admin).await;
    let token = app.login("admin@shop.test", PASSWORD).await;

    let response = app.request(Method::POST, AUTO, None, Some(&token)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Bad request: no store associated with session");
}

#[tokio::test]
async fn anonymous_requests_need_a_session() {
    let app = TestApp::new().await;
    let response = app.request(Method::POST, AUTO, None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn order_lines_keep_the_cost_at_generation_time() {
    let app = TestApp::new().await;
    let acme = app.seed_supplier("Acme").await;
    // stock 1, reorder 4, safety 1 -> 4 units at 2.50
    let item = app
        .seed_product("OIL-1L", Some(acme.id), 1, 4, 1, dec("2.50"))
        .await;

    let generated = body_json(app.as_manager(Method::POST, AUTO, None).await).await;
    let order_id = orders(&generated)[0]["id"].as_str().unwrap().to_string();

    let repriced = app
        .as_manager(
            Method::PUT,
            &format!("/api/v1/products/{}", item.id),
            Some(serde_json::json!({ "costPrice": "3.75" })),
        )
        .await;
    assert_eq!(repriced.status(), StatusCode::OK);
    assert_eq!(
        money(&body_json(repriced).await["data"]["costPrice"]),
        dec("3.75")
    );

    let order = app
        .as_manager(
            Method::GET,
            &format!("/api/v1/purchase-orders/{}", order_id),
            None,
        )
        .await;
    assert_eq!(order.status(), StatusCode::OK);
    let order = body_json(order).await["data"].clone();
    assert_eq!(order["items"][0]["quantity"], 4);
    assert_eq!(money(&order["items"][0]["costPrice"]), dec("2.50"));
    assert_eq!(money(&order["totalAmount"]), dec("10.00"));
}
