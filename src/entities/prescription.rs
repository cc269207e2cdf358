use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PrescriptionStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Uploaded prescription awaiting or holding a pharmacist decision.
/// The scanned document is kept base64-encoded and never serialized.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "prescriptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_id: Uuid,
    #[sea_orm(nullable)]
    pub product_id: Option<Uuid>,
    pub doctor_name: String,
    #[sea_orm(nullable)]
    pub issued_on: Option<NaiveDate>,
    #[sea_orm(nullable)]
    pub expires_on: Option<NaiveDate>,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    #[sea_orm(column_type = "Text")]
    #[serde(skip_serializing)]
    pub document_base64: String,
    pub status: PrescriptionStatus,
    #[sea_orm(nullable)]
    pub reviewed_by: Option<Uuid>,
    #[sea_orm(column_type = "Text", nullable)]
    pub review_notes: Option<String>,
    #[sea_orm(nullable)]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether this prescription lets its holder buy `product_id` on `today`
    pub fn authorizes(&self, product_id: Uuid, today: NaiveDate) -> bool {
        self.status == PrescriptionStatus::Approved
            && self.product_id == Some(product_id)
            && self.expires_on.map_or(true, |expiry| expiry >= today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prescription(status: PrescriptionStatus, product_id: Option<Uuid>) -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            product_id,
            doctor_name: "Dr. Ruiz".into(),
            issued_on: None,
            expires_on: None,
            file_name: "rx.pdf".into(),
            content_type: "application/pdf".into(),
            size_bytes: 3,
            document_base64: "AAAA".into(),
            status,
            reviewed_by: None,
            review_notes: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn only_approved_matching_unexpired_prescriptions_authorize() {
        let product = Uuid::new_v4();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        assert!(prescription(PrescriptionStatus::Approved, Some(product)).authorizes(product, today));
        assert!(!prescription(PrescriptionStatus::Pending, Some(product)).authorizes(product, today));
        assert!(!prescription(PrescriptionStatus::Approved, None).authorizes(product, today));
        assert!(!prescription(PrescriptionStatus::Approved, Some(Uuid::new_v4()))
            .authorizes(product, today));

        let mut expiring = prescription(PrescriptionStatus::Approved, Some(product));
        expiring.expires_on = Some(today);
        assert!(expiring.authorizes(product, today));
        expiring.expires_on = today.pred_opt();
        assert!(!expiring.authorizes(product, today));
    }
}
