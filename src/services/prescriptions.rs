use crate::{
    db::QueryBuilder,
    entities::{prescription, product, PrescriptionStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{PageRequest, Viewer},
    PaginatedResponse,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{NaiveDate, Utc};
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    EntityTrait, Iterable, PaginatorTrait, QueryFilter, QuerySelect, Select, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Document formats a prescription scan may be uploaded in
pub const ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UploadPrescriptionRequest {
    pub product_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub doctor_name: String,
    pub issued_on: Option<NaiveDate>,
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    #[schema(example = "application/pdf")]
    pub content_type: String,
    /// Document bytes, standard base64
    pub content_base64: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl From<ReviewDecision> for PrescriptionStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approved => PrescriptionStatus::Approved,
            ReviewDecision::Rejected => PrescriptionStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReviewPrescriptionRequest {
    pub decision: ReviewDecision,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub expires_on: Option<NaiveDate>,
}

/// Raw prescription document
#[derive(Debug, Clone)]
pub struct PrescriptionDocument {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct PrescriptionFilter {
    pub status: Option<PrescriptionStatus>,
    pub customer_id: Option<Uuid>,
    pub page: PageRequest,
}

/// Selects prescription rows with the stored scan blanked out. Only the
/// document download reads the base64 column.
pub fn without_document() -> Select<prescription::Entity> {
    prescription::Entity::find()
        .select_only()
        .columns(
            prescription::Column::iter()
                .filter(|c| !matches!(c, prescription::Column::DocumentBase64)),
        )
        .column_as(Expr::value(""), "document_base64")
}

/// True when the customer holds an approved, unexpired prescription for the product.
pub async fn has_valid_prescription<C: ConnectionTrait>(
    conn: &C,
    customer_id: Uuid,
    product_id: Uuid,
    today: NaiveDate,
) -> Result<bool, ServiceError> {
    let approved = without_document()
        .filter(prescription::Column::CustomerId.eq(customer_id))
        .filter(prescription::Column::ProductId.eq(product_id))
        .filter(prescription::Column::Status.eq(PrescriptionStatus::Approved))
        .all(conn)
        .await?;
    Ok(approved.iter().any(|p| p.authorizes(product_id, today)))
}

/// Rejects the purchase of a gated product without a valid prescription
pub async fn ensure_prescription_gate<C: ConnectionTrait>(
    conn: &C,
    customer_id: Uuid,
    product: &product::Model,
) -> Result<(), ServiceError> {
    if !product.requires_prescription {
        return Ok(());
    }
    let today = Utc::now().date_naive();
    if has_valid_prescription(conn, customer_id, product.id, today).await? {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "{} requires an approved prescription",
            product.name
        )))
    }
}

fn decode_document(content_base64: &str, max_bytes: usize) -> Result<Vec<u8>, ServiceError> {
    let bytes = STANDARD
        .decode(content_base64.trim())
        .map_err(|_| ServiceError::BadRequest("document is not valid base64".to_string()))?;
    if bytes.is_empty() {
        return Err(ServiceError::BadRequest("document is empty".to_string()));
    }
    if bytes.len() > max_bytes {
        return Err(ServiceError::BadRequest(format!(
            "document exceeds the {} byte limit",
            max_bytes
        )));
    }
    Ok(bytes)
}

#[derive(Clone)]
pub struct PrescriptionService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    max_document_bytes: usize,
}

impl PrescriptionService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        max_document_bytes: usize,
    ) -> Self {
        Self {
            db,
            event_sender,
            max_document_bytes,
        }
    }

    #[instrument(skip(self, request), fields(file_name = %request.file_name))]
    pub async fn upload(
        &self,
        customer_id: Uuid,
        request: UploadPrescriptionRequest,
    ) -> Result<prescription::Model, ServiceError> {
        request.validate()?;

        let content_type = request.content_type.trim().to_ascii_lowercase();
        if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
            return Err(ServiceError::BadRequest(format!(
                "unsupported content type {}; expected one of {}",
                content_type,
                ALLOWED_CONTENT_TYPES.join(", ")
            )));
        }
        let bytes = decode_document(&request.content_base64, self.max_document_bytes)?;

        if let Some(product_id) = request.product_id {
            if product::Entity::find_by_id(product_id)
                .one(&*self.db)
                .await?
                .is_none()
            {
                return Err(ServiceError::NotFound(format!(
                    "Product {} not found",
                    product_id
                )));
            }
        }

        let now = Utc::now();
        let prescription = prescription::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            product_id: Set(request.product_id),
            doctor_name: Set(request.doctor_name.trim().to_string()),
            issued_on: Set(request.issued_on),
            expires_on: Set(None),
            file_name: Set(request.file_name),
            content_type: Set(content_type),
            size_bytes: Set(bytes.len() as i64),
            document_base64: Set(STANDARD.encode(&bytes)),
            status: Set(PrescriptionStatus::Pending),
            reviewed_by: Set(None),
            review_notes: Set(None),
            reviewed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::PrescriptionUploaded(prescription.id))
            .await;
        info!(prescription_id = %prescription.id, size = bytes.len(), "prescription uploaded");
        Ok(prescription)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        viewer: Viewer,
        filter: PrescriptionFilter,
    ) -> Result<PaginatedResponse<prescription::Model>, ServiceError> {
        let mut condition = Condition::all();
        if let Some(customer_id) = viewer.customer_scope().or(filter.customer_id) {
            condition = condition.add(prescription::Column::CustomerId.eq(customer_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(prescription::Column::Status.eq(status));
        }

        let (items, total) = QueryBuilder::from_select(without_document())
            .filter(condition)
            .order_by(prescription::Column::CreatedAt, true)
            .paginate(filter.page.page, filter.page.limit)
            .execute(&*self.db)
            .await?;

        Ok(PaginatedResponse::new(
            items,
            total,
            filter.page.page,
            filter.page.limit,
        ))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, viewer: Viewer, id: Uuid) -> Result<prescription::Model, ServiceError> {
        without_document()
            .filter(prescription::Column::Id.eq(id))
            .one(&*self.db)
            .await?
            .filter(|p| viewer.can_see(p.customer_id))
            .ok_or_else(|| ServiceError::NotFound(format!("Prescription {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn document(
        &self,
        viewer: Viewer,
        id: Uuid,
    ) -> Result<PrescriptionDocument, ServiceError> {
        let prescription = prescription::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .filter(|p| viewer.can_see(p.customer_id))
            .ok_or_else(|| ServiceError::NotFound(format!("Prescription {} not found", id)))?;
        let bytes = STANDARD
            .decode(prescription.document_base64.as_bytes())
            .map_err(|e| ServiceError::InternalError(format!("stored document is corrupt: {}", e)))?;
        Ok(PrescriptionDocument {
            file_name: prescription.file_name,
            content_type: prescription.content_type,
            bytes,
        })
    }

    /// Approves or rejects a pending prescription
    #[instrument(skip(self))]
    pub async fn review(
        &self,
        reviewer_id: Uuid,
        id: Uuid,
        request: ReviewPrescriptionRequest,
    ) -> Result<prescription::Model, ServiceError> {
        request.validate()?;
        let existing = self.get(Viewer::Staff, id).await?;
        if existing.status != PrescriptionStatus::Pending {
            return Err(ServiceError::Conflict(format!(
                "prescription is already {}",
                existing.status
            )));
        }
        if let Some(expires_on) = request.expires_on {
            if expires_on < Utc::now().date_naive() {
                return Err(ServiceError::ValidationError(
                    "expires_on must not be in the past".to_string(),
                ));
            }
        }

        let status = PrescriptionStatus::from(request.decision);
        let now = Utc::now();
        let mut update = prescription::Entity::update_many()
            .col_expr(prescription::Column::Status, Expr::value(status))
            .col_expr(prescription::Column::ReviewedBy, Expr::value(Some(reviewer_id)))
            .col_expr(prescription::Column::ReviewNotes, Expr::value(request.notes))
            .col_expr(prescription::Column::ReviewedAt, Expr::value(Some(now)))
            .col_expr(prescription::Column::UpdatedAt, Expr::value(now));
        if let Some(expires_on) = request.expires_on {
            update = update.col_expr(
                prescription::Column::ExpiresOn,
                Expr::value(Some(expires_on)),
            );
        }
        let result = update
            .filter(prescription::Column::Id.eq(existing.id))
            .filter(prescription::Column::Status.eq(PrescriptionStatus::Pending))
            .exec(&*self.db)
            .await?;
        if result.rows_affected != 1 {
            return Err(ServiceError::Conflict(
                "prescription was reviewed concurrently".to_string(),
            ));
        }
        let prescription = self.get(Viewer::Staff, existing.id).await?;

        counter!("pharmacy.prescriptions.reviewed", 1, "decision" => status.to_string());
        self.event_sender
            .send_or_log(Event::PrescriptionReviewed {
                prescription_id: prescription.id,
                status,
                reviewed_by: reviewer_id,
            })
            .await;
        info!(prescription_id = %prescription.id, %status, "prescription reviewed");
        Ok(prescription)
    }

    /// Number of prescriptions awaiting review
    pub async fn pending_count(&self) -> Result<u64, ServiceError> {
        Ok(prescription::Entity::find()
            .filter(prescription::Column::Status.eq(PrescriptionStatus::Pending))
            .count(&*self.db)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn summary_select_leaves_the_scan_behind() {
        let sql = without_document().build(DbBackend::Sqlite).to_string();
        assert!(!sql.contains(r#""prescriptions"."document_base64""#));
        assert!(sql.contains(r#"AS "document_base64""#));
        assert!(sql.contains(r#""prescriptions"."size_bytes""#));
    }

    #[test]
    fn decode_enforces_size_bounds() {
        let encoded = STANDARD.encode(b"%PDF-1.4 scan");
        assert_eq!(decode_document(&encoded, 1024).unwrap(), b"%PDF-1.4 scan");
        assert!(decode_document(&encoded, 4).is_err());
        assert!(decode_document("", 1024).is_err());
        assert!(decode_document("not base64!!", 1024).is_err());
    }

    #[test]
    fn decision_maps_to_status() {
        assert_eq!(
            PrescriptionStatus::from(ReviewDecision::Approved),
            PrescriptionStatus::Approved
        );
        assert_eq!(
            PrescriptionStatus::from(ReviewDecision::Rejected),
            PrescriptionStatus::Rejected
        );
    }
}
