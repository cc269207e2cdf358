use crate::{
    auth::AuthRouterExt,
    errors::ServiceError,
    services::{
        inventory::{AdjustInventoryRequest, InventoryFilter, InventoryView, UpsertInventoryRequest},
        PageRequest,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::csv_attachment;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct InventoryListQuery {
    pub branch_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    /// Matches product name or SKU
    pub search: Option<String>,
    /// Only rows at or below their reorder level
    #[serde(default)]
    pub low_stock: bool,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/inventory", get(list_inventory).put(upsert_inventory))
        .route("/inventory/low-stock", get(low_stock))
        .route("/inventory/export", get(export_inventory))
        .route("/inventory/:id/adjust", post(adjust_inventory))
        .route("/inventory/:id", delete(delete_inventory))
        .with_staff()
}

/// Merged view of stock rows with product and branch names
pub async fn list_inventory(
    State(state): State<AppState>,
    Query(query): Query<InventoryListQuery>,
) -> ApiResult<PaginatedResponse<InventoryView>> {
    let filter = InventoryFilter {
        branch_id: query.branch_id,
        product_id: query.product_id,
        search: query.search,
        low_stock: query.low_stock,
        page: PageRequest::new(query.page, query.limit),
    };
    Ok(Json(ApiResponse::success(
        state.services.inventory.list(filter).await?,
    )))
}

pub async fn low_stock(State(state): State<AppState>) -> ApiResult<Vec<InventoryView>> {
    Ok(Json(ApiResponse::success(
        state.services.inventory.low_stock().await?,
    )))
}

pub async fn upsert_inventory(
    State(state): State<AppState>,
    Json(payload): Json<UpsertInventoryRequest>,
) -> ApiResult<InventoryView> {
    Ok(Json(ApiResponse::success(
        state.services.inventory.upsert(payload).await?,
    )))
}

pub async fn adjust_inventory(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdjustInventoryRequest>,
) -> ApiResult<InventoryView> {
    Ok(Json(ApiResponse::success(
        state.services.inventory.adjust(id, payload).await?,
    )))
}

pub async fn delete_inventory(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.inventory.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn export_inventory(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let csv = state.services.inventory.export_csv().await?;
    Ok(csv_attachment("inventory.csv", csv))
}
