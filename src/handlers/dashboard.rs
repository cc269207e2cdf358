use crate::{
    auth::AuthRouterExt, services::dashboard::DashboardSummary, ApiResponse, ApiResult, AppState,
};
use axum::{extract::State, routing::get, Json, Router};

pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/summary", get(summary))
        .with_staff()
}

/// Counts of work waiting for staff plus revenue to date
pub async fn summary(State(state): State<AppState>) -> ApiResult<DashboardSummary> {
    Ok(Json(ApiResponse::success(
        state.services.dashboard.summary().await?,
    )))
}
