use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pharmacy API",
        version = "0.1.0",
        description = r#"
# Pharmacy Management API

Customer commerce flows and staff operations for a multi-branch pharmacy.

## Features

- **Catalog**: product search with category, price and stock filters
- **Prescriptions**: document upload and pharmacist review
- **Cart & Checkout**: prescription-gated cart and branch checkout
- **Orders**: payment recording, delivery tracking and cancellation
- **Returns & Feedback**: delivered-order returns and product ratings
- **Staff**: inventory, low-stock alerts, CSV exports and a dashboard

## Authentication

Log in through `POST /api/auth/login` and send the returned token as
`Authorization: Bearer <token>` or rely on the `session_token` cookie.

## Pagination

List endpoints accept `page` (default 1) and `limit` (default 20, max 100) and
answer with `{items, total, page, limit, total_pages}`.
        "#,
        license(name = "MIT OR Apache-2.0")
    ),
    tags(
        (name = "Auth", description = "Registration, login and sessions"),
        (name = "Catalog", description = "Branches and products"),
        (name = "Inventory", description = "Per-branch stock management"),
        (name = "Cart", description = "Customer cart"),
        (name = "Orders", description = "Checkout, payments and delivery tracking"),
        (name = "Prescriptions", description = "Prescription upload and review"),
        (name = "Returns", description = "Return processing"),
        (name = "Feedback", description = "Ratings and comments"),
        (name = "Dashboard", description = "Staff overview"),
        (name = "Health", description = "Health check endpoints")
    ),
    components(
        schemas(
            // Auth
            crate::auth::RegisterRequest,
            crate::auth::LoginRequest,
            crate::auth::CreateStaffRequest,
            crate::auth::AccountResponse,
            crate::auth::SessionResponse,

            // Enumerations
            crate::entities::UserRole,
            crate::entities::OrderStatus,
            crate::entities::PaymentStatus,
            crate::entities::PaymentMethod,
            crate::entities::PaymentRecordStatus,
            crate::entities::PrescriptionStatus,
            crate::entities::ReturnStatus,

            // Catalog
            crate::services::branches::CreateBranchRequest,
            crate::services::branches::UpdateBranchRequest,
            crate::services::products::CreateProductRequest,
            crate::services::products::UpdateProductRequest,
            crate::services::products::BranchAvailability,

            // Inventory
            crate::services::inventory::UpsertInventoryRequest,
            crate::services::inventory::AdjustInventoryRequest,
            crate::services::inventory::InventoryView,

            // Customers & cart
            crate::services::customers::UpdateCustomerRequest,
            crate::services::cart::AddToCartRequest,
            crate::services::cart::SetQuantityRequest,
            crate::services::cart::CartLine,
            crate::services::cart::CartView,

            // Orders & payments
            crate::services::orders::CheckoutRequest,
            crate::services::orders::UpdateOrderStatusRequest,
            crate::services::orders::TrackingStep,
            crate::services::orders::OrderTracking,
            crate::services::payments::RecordPaymentRequest,

            // Prescriptions
            crate::services::prescriptions::UploadPrescriptionRequest,
            crate::services::prescriptions::ReviewDecision,
            crate::services::prescriptions::ReviewPrescriptionRequest,

            // Feedback & returns
            crate::services::feedback::SubmitFeedbackRequest,
            crate::services::returns::CreateReturnRequest,
            crate::services::returns::ResolveReturnRequest,

            // Dashboard & health
            crate::services::dashboard::DashboardSummary,
            crate::health::HealthStatus,
            crate::health::HealthInfo,
            crate::health::HealthDetail,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Serves the generated OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDocV1::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_request_schemas() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("Pharmacy API"));
        assert!(json.contains("CheckoutRequest"));
        assert!(json.contains("UploadPrescriptionRequest"));
        assert!(json.contains("ErrorResponse"));
    }
}
