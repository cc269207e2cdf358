//! Prescription upload, review and the cart gate for prescription-only products.

mod common;

use axum::http::{header, Method, StatusCode};
use chrono::{Duration, Utc};
use common::{encode_document, response_json, response_text, uuid_at, TestApp};
use pharmacy_api::entities::prescription;
use sea_orm::{sea_query::Expr, ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;

#[tokio::test]
async fn gated_product_needs_an_approved_prescription() {
    let app = TestApp::new().await;
    let product = app
        .create_product("AMX-500", "Amoxicillin 500mg", "12.50", true)
        .await;
    let customer = app.register_customer("rx@example.com").await;

    let response = app.add_to_cart(&customer, product, 1).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    app.approve_prescription_for(&customer, product).await;

    let response = app.add_to_cart(&customer, product, 1).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["item_count"], 1);
    assert_eq!(body["data"]["items"][0]["requires_prescription"], true);
}

#[tokio::test]
async fn prescription_for_another_product_does_not_unlock() {
    let app = TestApp::new().await;
    let amoxicillin = app
        .create_product("AMX-500", "Amoxicillin 500mg", "12.50", true)
        .await;
    let atorvastatin = app
        .create_product("ATV-20", "Atorvastatin 20mg", "18.75", true)
        .await;
    let customer = app.register_customer("other-rx@example.com").await;

    app.approve_prescription_for(&customer, amoxicillin).await;

    let response = app.add_to_cart(&customer, atorvastatin, 1).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn rejected_prescription_keeps_the_gate_closed() {
    let app = TestApp::new().await;
    let product = app
        .create_product("AMX-500", "Amoxicillin 500mg", "12.50", true)
        .await;
    let customer = app.register_customer("rejected@example.com").await;

    let response = app
        .request(
            Method::POST,
            "/api/prescriptions",
            Some(json!({
                "product_id": product,
                "doctor_name": "Dr. Grey",
                "file_name": "rx.png",
                "content_type": "image/png",
                "content_base64": encode_document(b"\x89PNG fake"),
            })),
            Some(&customer.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "pending");
    // The document itself is never echoed back in JSON
    assert!(body["data"].get("document_base64").is_none());
    let id = uuid_at(&body["data"]["id"]);

    let response = app
        .as_admin(
            Method::POST,
            &format!("/api/prescriptions/{id}/review"),
            Some(json!({ "decision": "rejected", "notes": "illegible" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "rejected");
    assert_eq!(body["data"]["review_notes"], "illegible");

    let response = app.add_to_cart(&customer, product, 1).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // A reviewed prescription cannot be reviewed again
    let response = app
        .as_admin(
            Method::POST,
            &format!("/api/prescriptions/{id}/review"),
            Some(json!({ "decision": "approved" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unsupported_document_type_is_rejected() {
    let app = TestApp::new().await;
    let customer = app.register_customer("gif@example.com").await;

    let response = app
        .request(
            Method::POST,
            "/api/prescriptions",
            Some(json!({
                "doctor_name": "Dr. Grey",
                "file_name": "rx.gif",
                "content_type": "image/gif",
                "content_base64": encode_document(b"GIF89a"),
            })),
            Some(&customer.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn customers_cannot_review_and_only_see_their_own() {
    let app = TestApp::new().await;
    let product = app
        .create_product("AMX-500", "Amoxicillin 500mg", "12.50", true)
        .await;
    let owner = app.register_customer("owner@example.com").await;
    let stranger = app.register_customer("stranger@example.com").await;

    let id = app.approve_prescription_for(&owner, product).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/prescriptions/{id}/review"),
            Some(json!({ "decision": "approved" })),
            Some(&owner.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(
            Method::GET,
            &format!("/api/prescriptions/{id}"),
            None,
            Some(&stranger.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .request(Method::GET, "/api/prescriptions", None, Some(&stranger.token))
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn document_download_returns_original_bytes() {
    let app = TestApp::new().await;
    let product = app
        .create_product("AMX-500", "Amoxicillin 500mg", "12.50", true)
        .await;
    let customer = app.register_customer("download@example.com").await;
    let id = app.approve_prescription_for(&customer, product).await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/prescriptions/{id}/document"),
            None,
            Some(&customer.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    assert_eq!(response_text(response).await, "%PDF-1.4 prescription");
}

async fn upload_document(app: &TestApp, customer: &common::Customer, bytes: &[u8]) -> StatusCode {
    app.request(
        Method::POST,
        "/api/prescriptions",
        Some(json!({
            "doctor_name": "Dr. Grey",
            "file_name": "scan.pdf",
            "content_type": "application/pdf",
            "content_base64": encode_document(bytes),
        })),
        Some(&customer.token),
    )
    .await
    .status()
}

#[tokio::test]
async fn multi_megabyte_scan_within_the_limit_is_accepted() {
    let app = TestApp::new().await;
    let customer = app.register_customer("big-scan@example.com").await;

    let scan = vec![b'%'; 3 * 1024 * 1024];
    assert_eq!(upload_document(&app, &customer, &scan).await, StatusCode::CREATED);

    // Listing leaves the stored scans out of the payload
    let response = app
        .request(Method::GET, "/api/prescriptions", None, Some(&customer.token))
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["size_bytes"], 3 * 1024 * 1024);
    assert!(body["data"]["items"][0].get("document_base64").is_none());
}

#[tokio::test]
async fn scan_one_byte_over_the_limit_is_rejected() {
    let app = TestApp::new().await;
    let customer = app.register_customer("too-big@example.com").await;
    let max = app.state.config.max_prescription_bytes;

    let scan = vec![b'%'; max + 1];
    assert_eq!(
        upload_document(&app, &customer, &scan).await,
        StatusCode::BAD_REQUEST
    );

    let scan = vec![b'%'; max];
    assert_eq!(upload_document(&app, &customer, &scan).await, StatusCode::CREATED);
}

#[tokio::test]
async fn expired_approval_closes_the_gate_again() {
    let app = TestApp::new().await;
    let product = app
        .create_product("AMX-500", "Amoxicillin 500mg", "12.50", true)
        .await;
    let customer = app.register_customer("expired-rx@example.com").await;
    let id = app.approve_prescription_for(&customer, product).await;

    let yesterday = Utc::now().date_naive() - Duration::days(1);
    prescription::Entity::update_many()
        .col_expr(prescription::Column::ExpiresOn, Expr::value(Some(yesterday)))
        .filter(prescription::Column::Id.eq(id))
        .exec(&*app.state.db)
        .await
        .expect("backdate expiry");

    let response = app.add_to_cart(&customer, product, 1).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn concurrent_reviews_settle_exactly_once() {
    let app = TestApp::new().await;
    let customer = app.register_customer("race-review@example.com").await;
    assert_eq!(
        upload_document(&app, &customer, b"%PDF-1.4 scan").await,
        StatusCode::CREATED
    );
    let response = app
        .request(Method::GET, "/api/prescriptions", None, Some(&customer.token))
        .await;
    let id = uuid_at(&response_json(response).await["data"]["items"][0]["id"]);
    let uri = format!("/api/prescriptions/{id}/review");

    let (approve, reject) = tokio::join!(
        app.as_admin(Method::POST, &uri, Some(json!({ "decision": "approved" }))),
        app.as_admin(Method::POST, &uri, Some(json!({ "decision": "rejected" }))),
    );
    let mut statuses = [approve.status(), reject.status()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);
}
