//! Order status transitions, cancellation and delivery tracking.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, response_text, TestApp};
use serde_json::json;

#[tokio::test]
async fn illegal_transitions_are_rejected() {
    let app = TestApp::new().await;
    let branch = app.create_branch("Central").await;
    let product = app
        .create_product("PAR-500", "Paracetamol 500mg", "4.25", false)
        .await;
    app.set_stock(branch, product, 10).await;
    let customer = app.register_customer("flow@example.com").await;

    app.add_to_cart(&customer, product, 1).await;
    let response = app.checkout(&customer, branch).await;
    let order_id = response_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();
    let status_uri = format!("/api/orders/{order_id}/status");

    // Unpaid orders cannot be pushed forward by staff
    let response = app
        .as_admin(Method::PUT, &status_uri, Some(json!({ "status": "processing" })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .as_admin(Method::PUT, &status_uri, Some(json!({ "status": "delivered" })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delivery_requires_a_tracking_number_and_stamps_delivery() {
    let app = TestApp::new().await;
    let branch = app.create_branch("Central").await;
    let product = app
        .create_product("PAR-500", "Paracetamol 500mg", "4.25", false)
        .await;
    app.set_stock(branch, product, 10).await;
    let customer = app.register_customer("track@example.com").await;

    let order = app.paid_order(&customer, branch, product, 2).await;
    let order_id = order["id"].as_str().unwrap();
    let status_uri = format!("/api/orders/{order_id}/status");

    let response = app
        .as_admin(Method::PUT, &status_uri, Some(json!({ "status": "processing" })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .as_admin(
            Method::PUT,
            &status_uri,
            Some(json!({ "status": "out_for_delivery" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .as_admin(
            Method::PUT,
            &status_uri,
            Some(json!({
                "status": "out_for_delivery",
                "tracking_number": "TRK-42",
                "estimated_delivery": "2030-01-15"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::GET,
            &format!("/api/orders/{order_id}/tracking"),
            None,
            Some(&customer.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let tracking = &body["data"];
    assert_eq!(tracking["status"], "out_for_delivery");
    assert_eq!(tracking["tracking_number"], "TRK-42");
    assert_eq!(tracking["estimated_delivery"], "2030-01-15");
    assert_eq!(tracking["cancelled"], false);
    let reached: Vec<bool> = tracking["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["reached"].as_bool().unwrap())
        .collect();
    assert_eq!(reached, vec![true, true, true, true, false]);

    let response = app
        .as_admin(Method::PUT, &status_uri, Some(json!({ "status": "delivered" })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert!(body["data"]["delivered_at"].is_string());

    // Delivered orders can no longer be cancelled, even by staff
    let response = app
        .as_admin(Method::POST, &format!("/api/orders/{order_id}/cancel"), None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancelling_restocks_and_refunds() {
    let app = TestApp::new().await;
    let branch = app.create_branch("Central").await;
    let product = app
        .create_product("PAR-500", "Paracetamol 500mg", "4.25", false)
        .await;
    app.set_stock(branch, product, 10).await;
    let customer = app.register_customer("cancel@example.com").await;

    let order = app.paid_order(&customer, branch, product, 4).await;
    let order_id = order["id"].as_str().unwrap();
    assert_eq!(app.stock_of(branch, product).await, 6);

    let response = app
        .request(
            Method::POST,
            &format!("/api/orders/{order_id}/cancel"),
            None,
            Some(&customer.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(body["data"]["payment_status"], "refunded");
    assert_eq!(body["data"]["payments"][0]["status"], "refunded");

    assert_eq!(app.stock_of(branch, product).await, 10);

    // Cancelling twice is not allowed
    let response = app
        .request(
            Method::POST,
            &format!("/api/orders/{order_id}/cancel"),
            None,
            Some(&customer.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::GET,
            &format!("/api/orders/{order_id}/tracking"),
            None,
            Some(&customer.token),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["cancelled"], true);
}

#[tokio::test]
async fn customers_cannot_cancel_orders_in_processing() {
    let app = TestApp::new().await;
    let branch = app.create_branch("Central").await;
    let product = app
        .create_product("PAR-500", "Paracetamol 500mg", "4.25", false)
        .await;
    app.set_stock(branch, product, 10).await;
    let customer = app.register_customer("late@example.com").await;

    let order = app.paid_order(&customer, branch, product, 1).await;
    let order_id = order["id"].as_str().unwrap();
    let response = app
        .as_admin(
            Method::PUT,
            &format!("/api/orders/{order_id}/status"),
            Some(json!({ "status": "processing" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::POST,
            &format!("/api/orders/{order_id}/cancel"),
            None,
            Some(&customer.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .as_admin(Method::POST, &format!("/api/orders/{order_id}/cancel"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn staff_listing_filters_by_status_and_exports_csv() {
    let app = TestApp::new().await;
    let branch = app.create_branch("Central").await;
    let product = app
        .create_product("PAR-500", "Paracetamol 500mg", "4.25", false)
        .await;
    app.set_stock(branch, product, 20).await;
    let first = app.register_customer("first@example.com").await;
    let second = app.register_customer("second@example.com").await;

    app.paid_order(&first, branch, product, 1).await;
    app.add_to_cart(&second, product, 1).await;
    app.checkout(&second, branch).await;

    let response = app.as_admin(Method::GET, "/api/orders", None).await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 2);

    let response = app
        .as_admin(Method::GET, "/api/orders?status=confirmed", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);

    // Customers only ever see their own orders
    let response = app
        .request(Method::GET, "/api/orders", None, Some(&second.token))
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["status"], "pending");

    let response = app.as_admin(Method::GET, "/api/orders/export", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let csv = response_text(response).await;
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("order_number,customer_id,branch_id,status,payment_status,total_amount,created_at")
    );
    assert_eq!(lines.count(), 2);
}

#[tokio::test]
async fn racing_cancellations_restock_once() {
    let app = TestApp::new().await;
    let branch = app.create_branch("Central").await;
    let product = app
        .create_product("PAR-500", "Paracetamol 500mg", "4.25", false)
        .await;
    app.set_stock(branch, product, 10).await;
    let customer = app.register_customer("double-cancel@example.com").await;

    let order = app.paid_order(&customer, branch, product, 4).await;
    let cancel = format!("/api/orders/{}/cancel", order["id"].as_str().unwrap());

    let (by_customer, by_staff) = tokio::join!(
        app.request(Method::POST, &cancel, None, Some(&customer.token)),
        app.as_admin(Method::POST, &cancel, None),
    );
    let statuses = [by_customer.status(), by_staff.status()];
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::OK).count(),
        1,
        "{statuses:?}"
    );
    assert!(statuses.iter().all(|s| *s == StatusCode::OK || s.is_client_error()));
    assert_eq!(app.stock_of(branch, product).await, 10);
}

#[tokio::test]
async fn cancel_racing_payment_never_keeps_the_money() {
    let app = TestApp::new().await;
    let branch = app.create_branch("Central").await;
    let product = app
        .create_product("PAR-500", "Paracetamol 500mg", "4.25", false)
        .await;
    app.set_stock(branch, product, 10).await;
    let customer = app.register_customer("race-pay@example.com").await;

    let response = app.add_to_cart(&customer, product, 2).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.checkout(&customer, branch).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let order = response_json(response).await["data"].clone();
    let order_id = order["id"].as_str().unwrap();

    let payments_path = format!("/api/orders/{order_id}/payments");
    let cancel_path = format!("/api/orders/{order_id}/cancel");
    let _ = tokio::join!(
        app.request(
            Method::POST,
            &payments_path,
            Some(json!({ "method": "cash", "amount": order["total_amount"] })),
            Some(&customer.token),
        ),
        app.request(
            Method::POST,
            &cancel_path,
            None,
            Some(&customer.token),
        ),
    );

    let response = app
        .request(
            Method::GET,
            &format!("/api/orders/{order_id}"),
            None,
            Some(&customer.token),
        )
        .await;
    let body = response_json(response).await;
    if body["data"]["status"] == "cancelled" {
        assert_ne!(body["data"]["payment_status"], "paid");
        assert_eq!(app.stock_of(branch, product).await, 10);
    } else {
        assert_eq!(body["data"]["payment_status"], "paid");
        assert_eq!(app.stock_of(branch, product).await, 8);
    }
}
