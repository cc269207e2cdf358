use crate::{
    auth::{AuthRouterExt, AuthUser},
    errors::ServiceError,
    services::cart::{AddToCartRequest, CartView, SetQuantityRequest},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use uuid::Uuid;

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(get_cart).post(add_to_cart).delete(clear_cart))
        .route(
            "/cart/:product_id",
            put(set_quantity).delete(remove_from_cart),
        )
        .with_customer()
}

pub async fn get_cart(State(state): State<AppState>, user: AuthUser) -> ApiResult<CartView> {
    let customer_id = user.require_customer()?;
    Ok(Json(ApiResponse::success(
        state.services.cart.get(customer_id).await?,
    )))
}

/// Adds a product; gated products require an approved prescription (403 otherwise)
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddToCartRequest>,
) -> ApiResult<CartView> {
    let customer_id = user.require_customer()?;
    Ok(Json(ApiResponse::success(
        state.services.cart.add(customer_id, payload).await?,
    )))
}

pub async fn set_quantity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<SetQuantityRequest>,
) -> ApiResult<CartView> {
    let customer_id = user.require_customer()?;
    Ok(Json(ApiResponse::success(
        state
            .services
            .cart
            .set_quantity(customer_id, product_id, payload)
            .await?,
    )))
}

pub async fn remove_from_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> ApiResult<CartView> {
    let customer_id = user.require_customer()?;
    Ok(Json(ApiResponse::success(
        state.services.cart.remove(customer_id, product_id).await?,
    )))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<StatusCode, ServiceError> {
    let customer_id = user.require_customer()?;
    state.services.cart.clear(customer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
