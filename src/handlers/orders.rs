use crate::{
    auth::{AuthRouterExt, AuthUser},
    entities::{order, payment, OrderStatus},
    errors::ServiceError,
    services::{
        orders::{CheckoutRequest, OrderDetail, OrderFilter, OrderTracking, UpdateOrderStatusRequest},
        payments::RecordPaymentRequest,
        PageRequest, Viewer,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{created, csv_attachment, CreatedResult};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    /// Staff only
    pub branch_id: Option<Uuid>,
    /// Staff only
    pub customer_id: Option<Uuid>,
    /// Created at or after (RFC 3339)
    pub from: Option<DateTime<Utc>>,
    /// Created at or before (RFC 3339)
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

pub fn order_routes() -> Router<AppState> {
    let customer = Router::new()
        .route("/orders/checkout", post(checkout))
        .route("/orders/:id/payments", post(record_payment))
        .with_customer();

    let authenticated = Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/orders/:id/tracking", get(track_order))
        .route("/orders/:id/payments", get(list_payments))
        .with_auth();

    let staff = Router::new()
        .route("/orders/export", get(export_orders))
        .route("/orders/:id/status", put(update_order_status))
        .with_staff();

    customer.merge(authenticated).merge(staff)
}

/// Converts the caller's cart into a pending order
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> CreatedResult<OrderDetail> {
    let customer_id = user.require_customer()?;
    Ok(created(
        state.services.orders.checkout(customer_id, payload).await?,
    ))
}

pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<PaginatedResponse<order::Model>> {
    let viewer = Viewer::from_auth(&user)?;
    let filter = OrderFilter {
        status: query.status,
        branch_id: query.branch_id,
        customer_id: query.customer_id,
        from: query.from,
        to: query.to,
        page: PageRequest::new(query.page, query.limit),
    };
    Ok(Json(ApiResponse::success(
        state.services.orders.list(viewer, filter).await?,
    )))
}

pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderDetail> {
    let viewer = Viewer::from_auth(&user)?;
    Ok(Json(ApiResponse::success(
        state.services.orders.get(viewer, id).await?,
    )))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderDetail> {
    let viewer = Viewer::from_auth(&user)?;
    Ok(Json(ApiResponse::success(
        state.services.orders.cancel(viewer, id).await?,
    )))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> ApiResult<order::Model> {
    Ok(Json(ApiResponse::success(
        state.services.orders.update_status(id, payload).await?,
    )))
}

pub async fn track_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderTracking> {
    let viewer = Viewer::from_auth(&user)?;
    Ok(Json(ApiResponse::success(
        state.services.orders.tracking(viewer, id).await?,
    )))
}

pub async fn export_orders(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let csv = state.services.orders.export_csv().await?;
    Ok(csv_attachment("orders.csv", csv))
}

pub async fn record_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordPaymentRequest>,
) -> CreatedResult<payment::Model> {
    let customer_id = user.require_customer()?;
    Ok(created(
        state
            .services
            .payments
            .record(customer_id, id, payload)
            .await?,
    ))
}

pub async fn list_payments(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<payment::Model>> {
    let viewer = Viewer::from_auth(&user)?;
    Ok(Json(ApiResponse::success(
        state.services.payments.list(viewer, id).await?,
    )))
}
