use crate::{
    auth::{AuthRouterExt, MaybeAuthUser},
    entities::{branch, UserRole},
    services::branches::{CreateBranchRequest, UpdateBranchRequest},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{created, CreatedResult};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct BranchListQuery {
    /// Staff may include deactivated branches
    #[serde(default)]
    pub include_inactive: bool,
}

pub fn branch_routes() -> Router<AppState> {
    let public = Router::new()
        .route("/branches", get(list_branches))
        .route("/branches/:id", get(get_branch))
        .with_optional_auth();

    let admin = Router::new()
        .route("/branches", post(create_branch))
        .route("/branches/:id", put(update_branch))
        .with_roles(&[UserRole::Admin]);

    public.merge(admin)
}

pub async fn list_branches(
    State(state): State<AppState>,
    caller: MaybeAuthUser,
    Query(query): Query<BranchListQuery>,
) -> ApiResult<Vec<branch::Model>> {
    let include_inactive = query.include_inactive && caller.is_staff();
    let branches = state.services.branches.list(include_inactive).await?;
    Ok(Json(ApiResponse::success(branches)))
}

pub async fn get_branch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<branch::Model> {
    Ok(Json(ApiResponse::success(
        state.services.branches.get(id).await?,
    )))
}

pub async fn create_branch(
    State(state): State<AppState>,
    Json(payload): Json<CreateBranchRequest>,
) -> CreatedResult<branch::Model> {
    Ok(created(state.services.branches.create(payload).await?))
}

pub async fn update_branch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBranchRequest>,
) -> ApiResult<branch::Model> {
    Ok(Json(ApiResponse::success(
        state.services.branches.update(id, payload).await?,
    )))
}
