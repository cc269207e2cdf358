use crate::{
    auth::{AuthRouterExt, AuthUser},
    entities::feedback,
    errors::ServiceError,
    services::{
        feedback::{FeedbackFilter, SubmitFeedbackRequest},
        PageRequest,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{created, CreatedResult};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct FeedbackListQuery {
    pub product_id: Option<Uuid>,
    pub min_rating: Option<i32>,
    pub max_rating: Option<i32>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

pub fn feedback_routes() -> Router<AppState> {
    let customer = Router::new()
        .route("/feedback", post(submit_feedback))
        .route("/feedback/mine", get(my_feedback))
        .with_customer();

    let staff = Router::new()
        .route("/feedback", get(list_feedback))
        .with_staff();

    customer.merge(staff)
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SubmitFeedbackRequest>,
) -> CreatedResult<feedback::Model> {
    let customer_id = user.require_customer()?;
    Ok(created(
        state.services.feedback.submit(customer_id, payload).await?,
    ))
}

pub async fn my_feedback(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Vec<feedback::Model>> {
    let customer_id = user.require_customer()?;
    Ok(Json(ApiResponse::success(
        state.services.feedback.mine(customer_id).await?,
    )))
}

pub async fn list_feedback(
    State(state): State<AppState>,
    Query(query): Query<FeedbackListQuery>,
) -> ApiResult<PaginatedResponse<feedback::Model>> {
    if let (Some(min), Some(max)) = (query.min_rating, query.max_rating) {
        if min > max {
            return Err(ServiceError::BadRequest(
                "min_rating cannot exceed max_rating".to_string(),
            ));
        }
    }
    let filter = FeedbackFilter {
        product_id: query.product_id,
        min_rating: query.min_rating,
        max_rating: query.max_rating,
        page: PageRequest::new(query.page, query.limit),
    };
    Ok(Json(ApiResponse::success(
        state.services.feedback.list(filter).await?,
    )))
}
