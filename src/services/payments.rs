use crate::{
    entities::{order, payment, OrderStatus, PaymentMethod, PaymentRecordStatus, PaymentStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{orders::find_order, Viewer},
};
use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RecordPaymentRequest {
    pub method: PaymentMethod,
    #[schema(value_type = String, example = "21.00")]
    pub amount: Decimal,
    #[validate(length(min = 1, max = 100))]
    pub transaction_reference: Option<String>,
}

/// Records payments against orders. No money moves; the pharmacy's terminal or insurer does that.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl PaymentService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Records the full payment of a pending order and confirms it
    #[instrument(skip(self))]
    pub async fn record(
        &self,
        customer_id: Uuid,
        order_id: Uuid,
        request: RecordPaymentRequest,
    ) -> Result<payment::Model, ServiceError> {
        request.validate()?;

        let txn = self.db.begin().await?;
        let existing = find_order(&txn, Viewer::Customer(customer_id), order_id).await?;

        if existing.status != OrderStatus::Pending || existing.payment_status != PaymentStatus::Unpaid
        {
            return Err(ServiceError::Conflict(format!(
                "order {} is {} and {}; only pending unpaid orders accept payment",
                existing.order_number, existing.status, existing.payment_status
            )));
        }
        if request.amount != existing.total_amount {
            return Err(ServiceError::BadRequest(format!(
                "payment amount {} does not match order total {}",
                request.amount, existing.total_amount
            )));
        }
        let reference = request
            .transaction_reference
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        if request.method.requires_reference() && reference.is_none() {
            return Err(ServiceError::BadRequest(format!(
                "{} payments require a transaction reference",
                request.method
            )));
        }

        let confirmed = order::Entity::update_many()
            .col_expr(order::Column::PaymentStatus, Expr::value(PaymentStatus::Paid))
            .col_expr(order::Column::Status, Expr::value(OrderStatus::Confirmed))
            .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Status.eq(OrderStatus::Pending))
            .filter(order::Column::PaymentStatus.eq(PaymentStatus::Unpaid))
            .exec(&txn)
            .await?;
        if confirmed.rows_affected != 1 {
            return Err(ServiceError::Conflict(
                "order was modified concurrently".to_string(),
            ));
        }

        let payment = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            amount: Set(request.amount),
            method: Set(request.method),
            status: Set(PaymentRecordStatus::Completed),
            transaction_reference: Set(reference),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        counter!("pharmacy.payments.recorded", 1, "method" => request.method.to_string());
        self.event_sender
            .send_or_log(Event::PaymentRecorded {
                payment_id: payment.id,
                order_id,
                amount: payment.amount,
            })
            .await;
        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: OrderStatus::Pending,
                new_status: OrderStatus::Confirmed,
            })
            .await;
        info!(payment_id = %payment.id, %order_id, method = %payment.method, "payment recorded");
        Ok(payment)
    }

    #[instrument(skip(self))]
    pub async fn list(&self, viewer: Viewer, order_id: Uuid) -> Result<Vec<payment::Model>, ServiceError> {
        find_order(&*self.db, viewer, order_id).await?;
        Ok(payment::Entity::find()
            .filter(payment::Column::OrderId.eq(order_id))
            .order_by_asc(payment::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Sum of completed payments
    pub async fn revenue(&self) -> Result<Decimal, ServiceError> {
        let amounts: Vec<Decimal> = payment::Entity::find()
            .select_only()
            .column(payment::Column::Amount)
            .filter(payment::Column::Status.eq(PaymentRecordStatus::Completed))
            .into_tuple()
            .all(&*self.db)
            .await?;
        Ok(amounts.into_iter().sum())
    }
}
