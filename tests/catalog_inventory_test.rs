//! Catalog browsing, stock management, exports, feedback and the staff dashboard.

mod common;

use axum::http::{header, Method, StatusCode};
use common::{decimal_at, response_json, response_text, uuid_at, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn catalog_filters_and_categories() {
    let app = TestApp::new().await;
    let branch = app.create_branch("Central").await;

    for (sku, name, category, price, rx) in [
        ("PAR-500", "Paracetamol 500mg", "pain-relief", "4.25", false),
        ("IBU-200", "Ibuprofen 200mg", "pain-relief", "5.50", false),
        ("AMX-500", "Amoxicillin 500mg", "antibiotics", "12.50", true),
    ] {
        let response = app
            .as_admin(
                Method::POST,
                "/api/products",
                Some(json!({
                    "sku": sku,
                    "name": name,
                    "category": category,
                    "price": price,
                    "requires_prescription": rx
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = uuid_at(&response_json(response).await["data"]["id"]);
        if sku == "IBU-200" {
            app.set_stock(branch, id, 5).await;
        }
    }

    // Browsing needs no session
    let response = app.request(Method::GET, "/api/products", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["data"]["total"], 3);

    let response = app
        .request(Method::GET, "/api/products/categories", None, None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"], json!(["antibiotics", "pain-relief"]));

    let response = app
        .request(
            Method::GET,
            "/api/products?category=pain-relief&min_price=5.00",
            None,
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["sku"], "IBU-200");

    let response = app
        .request(
            Method::GET,
            "/api/products?requires_prescription=true",
            None,
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["sku"], "AMX-500");

    let response = app
        .request(
            Method::GET,
            &format!("/api/products?in_stock=true&branch_id={branch}"),
            None,
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["sku"], "IBU-200");

    let response = app
        .request(
            Method::GET,
            "/api/products?sort_by=price&sort_order=desc",
            None,
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["items"][0]["sku"], "AMX-500");

    let response = app
        .request(Method::GET, "/api/products?search=ibu", None, None)
        .await;
    assert_eq!(response_json(response).await["data"]["total"], 1);

    let response = app
        .request(
            Method::GET,
            "/api/products?min_price=10&max_price=1",
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_sku_conflicts_and_deactivation_hides_product() {
    let app = TestApp::new().await;
    let branch = app.create_branch("Central").await;
    let product = app
        .create_product("PAR-500", "Paracetamol 500mg", "4.25", false)
        .await;
    app.set_stock(branch, product, 3).await;

    let response = app
        .as_admin(
            Method::POST,
            "/api/products",
            Some(json!({
                "sku": "PAR-500",
                "name": "Paracetamol again",
                "category": "general",
                "price": "4.00"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .request(Method::GET, &format!("/api/products/{product}"), None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["total_quantity"], 3);
    assert_eq!(body["data"]["availability"][0]["in_stock"], true);

    let response = app
        .as_admin(Method::DELETE, &format!("/api/products/{product}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(Method::GET, &format!("/api/products/{product}"), None, None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.request(Method::GET, "/api/products", None, None).await;
    assert_eq!(response_json(response).await["data"]["total"], 0);

    // Staff can still look it up
    let response = app
        .as_admin(Method::GET, "/api/products?include_inactive=true", None)
        .await;
    assert_eq!(response_json(response).await["data"]["total"], 1);
}

#[tokio::test]
async fn upsert_adjust_and_low_stock() {
    let app = TestApp::new().await;
    let branch = app.create_branch("Central").await;
    let product = app
        .create_product("PAR-500", "Paracetamol 500mg", "4.25", false)
        .await;

    let response = app
        .as_admin(
            Method::PUT,
            "/api/inventory",
            Some(json!({
                "branch_id": uuid::Uuid::new_v4(),
                "product_id": product,
                "quantity": 5
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let row = app.set_stock(branch, product, 5).await;
    // A second upsert replaces rather than duplicates
    assert_eq!(app.set_stock(branch, product, 6).await, row);

    let adjust = format!("/api/inventory/{row}/adjust");
    let response = app
        .as_admin(
            Method::POST,
            &adjust,
            Some(json!({ "delta": -7, "reason": "breakage" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.stock_of(branch, product).await, 6);

    let response = app
        .as_admin(
            Method::POST,
            &adjust,
            Some(json!({ "delta": -4, "reason": "expired batch" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["quantity"], 2);
    assert_eq!(body["data"]["low_stock"], true);
    assert_eq!(body["data"]["branch_name"], "Central");

    let response = app
        .as_admin(Method::GET, "/api/inventory/low-stock", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"][0]["sku"], "PAR-500");

    let response = app
        .as_admin(Method::DELETE, &format!("/api/inventory/{row}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = app
        .as_admin(Method::DELETE, &format!("/api/inventory/{row}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn inventory_export_quotes_awkward_names() {
    let app = TestApp::new().await;
    let branch = app.create_branch("Central").await;
    let product = app
        .create_product("VIT-C", "Vitamin C, \"chewable\"", "3.10", false)
        .await;
    app.set_stock(branch, product, 12).await;

    let response = app
        .as_admin(Method::GET, "/api/inventory/export", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/csv"));

    let csv = response_text(response).await;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "branch,sku,product,quantity,reorder_level,low_stock,updated_at"
    );
    assert!(lines[1].starts_with("Central,VIT-C,\"Vitamin C, \"\"chewable\"\"\",12,2,false,"));
}

#[tokio::test]
async fn feedback_averages_and_dashboard_counts() {
    let app = TestApp::new().await;
    let branch = app.create_branch("Central").await;
    let product = app
        .create_product("PAR-500", "Paracetamol 500mg", "4.25", false)
        .await;
    app.set_stock(branch, product, 10).await;
    let first = app.register_customer("rater1@example.com").await;
    let second = app.register_customer("rater2@example.com").await;

    for (customer, rating) in [(&first, 4), (&second, 5)] {
        let response = app
            .request(
                Method::POST,
                "/api/feedback",
                Some(json!({ "product_id": product, "rating": rating, "comment": "works" })),
                Some(&customer.token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .request(
            Method::POST,
            "/api/feedback",
            Some(json!({ "product_id": product, "rating": 6 })),
            Some(&first.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::POST,
            "/api/feedback",
            Some(json!({ "rating": 3 })),
            Some(&first.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::GET,
            &format!("/api/products/{product}/feedback"),
            None,
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["count"], 2);
    assert_eq!(body["data"]["average_rating"], 4.5);

    let response = app
        .request(Method::GET, "/api/feedback/mine", None, Some(&first.token))
        .await;
    assert_eq!(
        response_json(response).await["data"].as_array().map(Vec::len),
        Some(1)
    );

    let response = app
        .as_admin(Method::GET, "/api/feedback?min_rating=5", None)
        .await;
    assert_eq!(response_json(response).await["data"]["total"], 1);

    app.paid_order(&first, branch, product, 2).await;
    app.add_to_cart(&second, product, 1).await;
    app.checkout(&second, branch).await;

    let response = app
        .as_admin(Method::GET, "/api/dashboard/summary", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let summary = &body["data"];
    assert_eq!(summary["total_orders"], 2);
    assert_eq!(summary["orders_by_status"]["confirmed"], 1);
    assert_eq!(summary["orders_by_status"]["pending"], 1);
    assert_eq!(summary["pending_prescriptions"], 0);
    assert_eq!(summary["open_returns"], 0);
    assert_eq!(decimal_at(&summary["revenue"]), dec!(8.50));
}

#[tokio::test]
async fn adjustment_applies_on_top_of_a_concurrent_sale() {
    let app = TestApp::new().await;
    let branch = app.create_branch("Central").await;
    let product = app
        .create_product("PAR-500", "Paracetamol 500mg", "4.25", false)
        .await;
    let row = app.set_stock(branch, product, 6).await;
    let customer = app.register_customer("shopper@example.com").await;
    let response = app.add_to_cart(&customer, product, 2).await;
    assert_eq!(response.status(), StatusCode::OK);

    let adjust = format!("/api/inventory/{row}/adjust");
    let (checkout, adjusted) = tokio::join!(
        app.checkout(&customer, branch),
        app.as_admin(
            Method::POST,
            &adjust,
            Some(json!({ "delta": 3, "reason": "delivery received" })),
        ),
    );
    assert_eq!(checkout.status(), StatusCode::CREATED);
    assert_eq!(adjusted.status(), StatusCode::OK);
    assert_eq!(app.stock_of(branch, product).await, 7);

    let response = app
        .as_admin(
            Method::POST,
            &format!("/api/inventory/{}/adjust", uuid::Uuid::new_v4()),
            Some(json!({ "delta": -1, "reason": "breakage" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
