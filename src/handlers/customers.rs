use crate::{
    auth::{AuthRouterExt, AuthUser},
    entities::customer,
    services::{customers::UpdateCustomerRequest, PageRequest},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CustomerListQuery {
    /// Matches first name, last name or email
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

pub fn customer_routes() -> Router<AppState> {
    let own = Router::new()
        .route("/customers/me", get(get_me).put(update_me))
        .with_customer();

    let staff = Router::new()
        .route("/customers", get(list_customers))
        .route("/customers/:id", get(get_customer))
        .with_staff();

    own.merge(staff)
}

pub async fn get_me(State(state): State<AppState>, user: AuthUser) -> ApiResult<customer::Model> {
    let customer_id = user.require_customer()?;
    Ok(Json(ApiResponse::success(
        state.services.customers.get(customer_id).await?,
    )))
}

pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateCustomerRequest>,
) -> ApiResult<customer::Model> {
    let customer_id = user.require_customer()?;
    Ok(Json(ApiResponse::success(
        state.services.customers.update(customer_id, payload).await?,
    )))
}

pub async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<CustomerListQuery>,
) -> ApiResult<PaginatedResponse<customer::Model>> {
    let page = PageRequest::new(query.page, query.limit);
    Ok(Json(ApiResponse::success(
        state.services.customers.list(query.search, page).await?,
    )))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<customer::Model> {
    Ok(Json(ApiResponse::success(
        state.services.customers.get(id).await?,
    )))
}
