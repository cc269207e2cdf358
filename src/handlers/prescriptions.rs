use crate::{
    auth::{AuthRouterExt, AuthUser},
    entities::{prescription, PrescriptionStatus},
    errors::ServiceError,
    services::{
        prescriptions::{PrescriptionFilter, ReviewPrescriptionRequest, UploadPrescriptionRequest},
        PageRequest, Viewer,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{created, inline_document, CreatedResult};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PrescriptionListQuery {
    pub status: Option<PrescriptionStatus>,
    /// Staff only
    pub customer_id: Option<Uuid>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Request body ceiling for an upload carrying `max_document_bytes` of
/// decoded document: the base64 expansion plus room for the other fields.
pub fn upload_body_limit(max_document_bytes: usize) -> usize {
    const JSON_OVERHEAD: usize = 64 * 1024;
    max_document_bytes.div_ceil(3) * 4 + JSON_OVERHEAD
}

pub fn prescription_routes(max_document_bytes: usize) -> Router<AppState> {
    let customer = Router::new()
        .route("/prescriptions", post(upload_prescription))
        .layer(DefaultBodyLimit::max(upload_body_limit(max_document_bytes)))
        .with_customer();

    let authenticated = Router::new()
        .route("/prescriptions", get(list_prescriptions))
        .route("/prescriptions/:id", get(get_prescription))
        .route("/prescriptions/:id/document", get(get_document))
        .with_auth();

    let reviewers = Router::new()
        .route("/prescriptions/:id/review", post(review_prescription))
        .with_staff();

    customer.merge(authenticated).merge(reviewers)
}

pub async fn upload_prescription(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UploadPrescriptionRequest>,
) -> CreatedResult<prescription::Model> {
    let customer_id = user.require_customer()?;
    Ok(created(
        state
            .services
            .prescriptions
            .upload(customer_id, payload)
            .await?,
    ))
}

pub async fn list_prescriptions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PrescriptionListQuery>,
) -> ApiResult<PaginatedResponse<prescription::Model>> {
    let viewer = Viewer::from_auth(&user)?;
    let filter = PrescriptionFilter {
        status: query.status,
        customer_id: query.customer_id,
        page: PageRequest::new(query.page, query.limit),
    };
    Ok(Json(ApiResponse::success(
        state.services.prescriptions.list(viewer, filter).await?,
    )))
}

pub async fn get_prescription(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<prescription::Model> {
    let viewer = Viewer::from_auth(&user)?;
    Ok(Json(ApiResponse::success(
        state.services.prescriptions.get(viewer, id).await?,
    )))
}

/// Serves the uploaded scan with its stored content type
pub async fn get_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let viewer = Viewer::from_auth(&user)?;
    let document = state.services.prescriptions.document(viewer, id).await?;
    Ok(inline_document(
        &document.file_name,
        &document.content_type,
        document.bytes,
    ))
}

pub async fn review_prescription(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewPrescriptionRequest>,
) -> ApiResult<prescription::Model> {
    Ok(Json(ApiResponse::success(
        state
            .services
            .prescriptions
            .review(user.user_id, id, payload)
            .await?,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    #[test]
    fn upload_limit_admits_a_maximal_document() {
        let max = 5 * 1024 * 1024;
        let encoded = STANDARD.encode(vec![0u8; max + 1]).len();
        assert!(upload_body_limit(max) > encoded + 1024);
        assert!(upload_body_limit(max) > 2 * 1024 * 1024);
    }
}
