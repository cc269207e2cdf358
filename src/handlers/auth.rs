use crate::{
    auth::{
        AccountResponse, AuthError, AuthRouterExt, AuthUser, CreateStaffRequest, LoginRequest,
        RegisterRequest, SessionResponse,
    },
    entities::UserRole,
    errors::ServiceError,
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::info;

use super::common::{created, CreatedResult};

pub fn auth_routes() -> Router<AppState> {
    let public = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login));

    let authenticated = Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .with_auth();

    let admin = Router::new()
        .route("/auth/staff", post(create_staff))
        .with_roles(&[UserRole::Admin]);

    public.merge(authenticated).merge(admin)
}

fn with_cookie(mut response: Response, cookie: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

/// Customer self-registration; the new session is returned and set as a cookie
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response, ServiceError> {
    let session = state.services.auth.register(payload).await?;
    let cookie = state.services.auth.session_cookie(&session.token);
    Ok(with_cookie(created(session).into_response(), &cookie))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AuthError> {
    let session: SessionResponse = state.services.auth.login(payload).await?;
    let cookie = state.services.auth.session_cookie(&session.token);
    Ok(with_cookie(
        Json(ApiResponse::success(session)).into_response(),
        &cookie,
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    state.services.auth.logout(user.session_id).await?;
    info!(user_id = %user.user_id, "user logged out");
    let cookie = state.services.auth.clear_session_cookie();
    Ok(with_cookie(StatusCode::NO_CONTENT.into_response(), &cookie))
}

pub async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<AccountResponse> {
    let account = state.services.auth.account(&user).await?;
    Ok(Json(ApiResponse::success(account)))
}

pub async fn create_staff(
    State(state): State<AppState>,
    Json(payload): Json<CreateStaffRequest>,
) -> CreatedResult<AccountResponse> {
    let account = state.services.auth.create_staff(payload).await?;
    Ok(created(account))
}
