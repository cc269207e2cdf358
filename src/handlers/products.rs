use crate::{
    auth::{AuthRouterExt, MaybeAuthUser},
    entities::product,
    services::{
        feedback::ProductFeedback,
        products::{
            CreateProductRequest, ProductDetail, ProductFilter, ProductSort, UpdateProductRequest,
        },
        PageRequest,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{created, parse_sort_order, split_list, CreatedResult};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ProductListQuery {
    /// Matches name, SKU or manufacturer
    pub search: Option<String>,
    /// Comma separated list of categories
    pub category: Option<String>,
    pub requires_prescription: Option<bool>,
    #[param(value_type = Option<String>)]
    pub min_price: Option<Decimal>,
    #[param(value_type = Option<String>)]
    pub max_price: Option<Decimal>,
    pub branch_id: Option<Uuid>,
    #[serde(default)]
    pub in_stock: bool,
    /// name, price or created_at
    pub sort_by: Option<String>,
    /// asc or desc
    pub sort_order: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

pub fn product_routes() -> Router<AppState> {
    let public = Router::new()
        .route("/products", get(list_products))
        .route("/products/categories", get(list_categories))
        .route("/products/:id", get(get_product))
        .route("/products/:id/feedback", get(product_feedback))
        .with_optional_auth();

    let staff = Router::new()
        .route("/products", post(create_product))
        .route(
            "/products/:id",
            put(update_product).delete(deactivate_product),
        )
        .with_staff();

    public.merge(staff)
}

/// Catalog search; inactive products are visible to staff only
pub async fn list_products(
    State(state): State<AppState>,
    caller: MaybeAuthUser,
    Query(query): Query<ProductListQuery>,
) -> ApiResult<PaginatedResponse<product::Model>> {
    let filter = ProductFilter {
        search: query.search,
        categories: split_list(query.category.as_deref()),
        requires_prescription: query.requires_prescription,
        min_price: query.min_price,
        max_price: query.max_price,
        branch_id: query.branch_id,
        in_stock: query.in_stock,
        include_inactive: query.include_inactive && caller.is_staff(),
        sort: ProductSort::parse(query.sort_by.as_deref())?,
        descending: parse_sort_order(query.sort_order.as_deref())?,
        page: PageRequest::new(query.page, query.limit),
    };
    let page = state.services.products.list(filter).await?;
    Ok(Json(ApiResponse::success(page)))
}

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    let categories = state.services.products.categories().await?;
    Ok(Json(ApiResponse::success(categories)))
}

pub async fn get_product(
    State(state): State<AppState>,
    caller: MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<ProductDetail> {
    let detail = state
        .services
        .products
        .get_detail(id, caller.is_staff())
        .await?;
    Ok(Json(ApiResponse::success(detail)))
}

pub async fn product_feedback(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ProductFeedback> {
    let feedback = state.services.feedback.for_product(id).await?;
    Ok(Json(ApiResponse::success(feedback)))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> CreatedResult<product::Model> {
    Ok(created(state.services.products.create(payload).await?))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> ApiResult<product::Model> {
    let product = state.services.products.update(id, payload).await?;
    Ok(Json(ApiResponse::success(product)))
}

/// Hides the product from the catalog and removes it from every cart
pub async fn deactivate_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, crate::errors::ServiceError> {
    state.services.products.deactivate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
