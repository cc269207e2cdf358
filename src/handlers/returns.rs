use crate::{
    auth::{AuthRouterExt, AuthUser},
    entities::{return_request, ReturnStatus},
    services::{
        returns::{CreateReturnRequest, ResolveReturnRequest, ReturnFilter},
        PageRequest, Viewer,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{created, CreatedResult};

#[derive(Debug, Deserialize, Default, IntoParams)]
pub struct ReturnListQuery {
    /// Page number (1-indexed)
    pub page: Option<u64>,
    /// Page size (max 100)
    pub limit: Option<u64>,
    pub status: Option<ReturnStatus>,
}

pub fn return_routes() -> Router<AppState> {
    let customer = Router::new()
        .route("/returns", post(create_return))
        .with_customer();

    let authenticated = Router::new()
        .route("/returns", get(list_returns))
        .route("/returns/:id", get(get_return))
        .with_auth();

    let staff = Router::new()
        .route("/returns/:id/approve", post(approve_return))
        .route("/returns/:id/reject", post(reject_return))
        .route("/returns/:id/complete", post(complete_return))
        .with_staff();

    customer.merge(authenticated).merge(staff)
}

pub async fn create_return(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateReturnRequest>,
) -> CreatedResult<return_request::Model> {
    let customer_id = user.require_customer()?;
    Ok(created(
        state.services.returns.create(customer_id, payload).await?,
    ))
}

pub async fn list_returns(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ReturnListQuery>,
) -> ApiResult<PaginatedResponse<return_request::Model>> {
    let viewer = Viewer::from_auth(&user)?;
    let filter = ReturnFilter {
        status: query.status,
        page: PageRequest::new(query.page, query.limit),
    };
    Ok(Json(ApiResponse::success(
        state.services.returns.list(viewer, filter).await?,
    )))
}

pub async fn get_return(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<return_request::Model> {
    let viewer = Viewer::from_auth(&user)?;
    Ok(Json(ApiResponse::success(
        state.services.returns.get(viewer, id).await?,
    )))
}

pub async fn approve_return(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ResolveReturnRequest>>,
) -> ApiResult<return_request::Model> {
    let request = payload.map(|Json(p)| p).unwrap_or_default();
    Ok(Json(ApiResponse::success(
        state.services.returns.approve(id, request).await?,
    )))
}

pub async fn reject_return(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ResolveReturnRequest>>,
) -> ApiResult<return_request::Model> {
    let request = payload.map(|Json(p)| p).unwrap_or_default();
    Ok(Json(ApiResponse::success(
        state.services.returns.reject(id, request).await?,
    )))
}

/// Closes an approved return and restocks the goods at the order's branch
pub async fn complete_return(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<return_request::Model> {
    Ok(Json(ApiResponse::success(
        state.services.returns.complete(id).await?,
    )))
}
