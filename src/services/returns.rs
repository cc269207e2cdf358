use crate::{
    db::QueryBuilder,
    entities::{order, order_item, return_request, OrderStatus, ReturnStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{inventory::restock, orders::find_order, PageRequest, Viewer},
    PaginatedResponse,
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateReturnRequest {
    pub order_item_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(length(min = 1, max = 2000))]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct ResolveReturnRequest {
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReturnFilter {
    pub status: Option<ReturnStatus>,
    pub page: PageRequest,
}

/// Whether a delivery at `delivered_at` can still be returned at `now`
pub fn within_return_window(delivered_at: DateTime<Utc>, now: DateTime<Utc>, window_days: i64) -> bool {
    now <= delivered_at + Duration::days(window_days)
}

#[derive(Clone)]
pub struct ReturnService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    window_days: i64,
}

impl ReturnService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>, window_days: i64) -> Self {
        Self {
            db,
            event_sender,
            window_days,
        }
    }

    /// Opens a return for part or all of a delivered order line
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        customer_id: Uuid,
        request: CreateReturnRequest,
    ) -> Result<return_request::Model, ServiceError> {
        request.validate()?;

        let item = order_item::Entity::find_by_id(request.order_item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order item {} not found", request.order_item_id))
            })?;
        let order = find_order(&*self.db, Viewer::Customer(customer_id), item.order_id).await?;

        if order.status != OrderStatus::Delivered {
            return Err(ServiceError::BadRequest(
                "only delivered orders can be returned".to_string(),
            ));
        }
        let delivered_at = order.delivered_at.unwrap_or(order.updated_at);
        if !within_return_window(delivered_at, Utc::now(), self.window_days) {
            return Err(ServiceError::BadRequest(format!(
                "the {} day return window has passed",
                self.window_days
            )));
        }

        let already_returned: i32 = return_request::Entity::find()
            .filter(return_request::Column::OrderItemId.eq(item.id))
            .all(&*self.db)
            .await?
            .iter()
            .filter(|r| r.status.counts_against_item())
            .map(|r| r.quantity)
            .sum();
        let returnable = item.quantity - already_returned;
        if request.quantity > returnable {
            return Err(ServiceError::BadRequest(format!(
                "only {} of {} units can still be returned",
                returnable.max(0),
                item.quantity
            )));
        }

        let now = Utc::now();
        let created = return_request::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            order_item_id: Set(item.id),
            customer_id: Set(customer_id),
            quantity: Set(request.quantity),
            reason: Set(request.reason.trim().to_string()),
            status: Set(ReturnStatus::Requested),
            refund_amount: Set(item.unit_price * Decimal::from(request.quantity)),
            resolution_notes: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::ReturnRequested(created.id))
            .await;
        info!(return_id = %created.id, order_id = %order.id, quantity = created.quantity, "return requested");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        viewer: Viewer,
        filter: ReturnFilter,
    ) -> Result<PaginatedResponse<return_request::Model>, ServiceError> {
        let mut condition = Condition::all();
        if let Some(customer_id) = viewer.customer_scope() {
            condition = condition.add(return_request::Column::CustomerId.eq(customer_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(return_request::Column::Status.eq(status));
        }

        let (items, total) = QueryBuilder::<return_request::Entity>::new()
            .filter(condition)
            .order_by(return_request::Column::CreatedAt, true)
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
    pub async fn get(&self, viewer: Viewer, id: Uuid) -> Result<return_request::Model, ServiceError> {
        return_request::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .filter(|r| viewer.can_see(r.customer_id))
            .ok_or_else(|| ServiceError::NotFound(format!("Return {} not found", id)))
    }

    async fn resolve(
        &self,
        id: Uuid,
        status: ReturnStatus,
        notes: Option<String>,
    ) -> Result<return_request::Model, ServiceError> {
        let existing = self.get(Viewer::Staff, id).await?;
        if existing.status != ReturnStatus::Requested {
            return Err(ServiceError::Conflict(format!(
                "return is already {}",
                existing.status
            )));
        }

        let result = return_request::Entity::update_many()
            .col_expr(return_request::Column::Status, Expr::value(status))
            .col_expr(return_request::Column::ResolutionNotes, Expr::value(notes))
            .col_expr(return_request::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(return_request::Column::Id.eq(existing.id))
            .filter(return_request::Column::Status.eq(ReturnStatus::Requested))
            .exec(&*self.db)
            .await?;
        if result.rows_affected != 1 {
            return Err(ServiceError::Conflict(
                "return was resolved concurrently".to_string(),
            ));
        }
        let updated = self.get(Viewer::Staff, id).await?;

        self.publish(&updated).await;
        Ok(updated)
    }

    async fn publish(&self, updated: &return_request::Model) {
        self.event_sender
            .send_or_log(Event::ReturnStatusChanged {
                return_id: updated.id,
                status: updated.status,
                timestamp: updated.updated_at,
            })
            .await;
        info!(return_id = %updated.id, status = %updated.status, "return status changed");
    }

    #[instrument(skip(self))]
    pub async fn approve(
        &self,
        id: Uuid,
        request: ResolveReturnRequest,
    ) -> Result<return_request::Model, ServiceError> {
        request.validate()?;
        self.resolve(id, ReturnStatus::Approved, request.notes).await
    }

    #[instrument(skip(self))]
    pub async fn reject(
        &self,
        id: Uuid,
        request: ResolveReturnRequest,
    ) -> Result<return_request::Model, ServiceError> {
        request.validate()?;
        self.resolve(id, ReturnStatus::Rejected, request.notes).await
    }

    /// Completes an approved return and puts the goods back on the order's branch shelf
    #[instrument(skip(self))]
    pub async fn complete(&self, id: Uuid) -> Result<return_request::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let existing = return_request::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Return {} not found", id)))?;
        if existing.status != ReturnStatus::Approved {
            return Err(ServiceError::Conflict(format!(
                "only approved returns can be completed; this one is {}",
                existing.status
            )));
        }

        let order = order::Entity::find_by_id(existing.order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", existing.order_id)))?;
        let item = order_item::Entity::find_by_id(existing.order_item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order item {} not found", existing.order_item_id))
            })?;

        let result = return_request::Entity::update_many()
            .col_expr(
                return_request::Column::Status,
                Expr::value(ReturnStatus::Completed),
            )
            .col_expr(return_request::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(return_request::Column::Id.eq(id))
            .filter(return_request::Column::Status.eq(ReturnStatus::Approved))
            .exec(&txn)
            .await?;
        if result.rows_affected != 1 {
            return Err(ServiceError::Conflict(
                "return was completed concurrently".to_string(),
            ));
        }
        restock(&txn, order.branch_id, item.product_id, existing.quantity).await?;

        let updated = return_request::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Return {} not found", id)))?;

        txn.commit().await?;

        self.publish(&updated).await;
        Ok(updated)
    }

    /// Returns still awaiting a decision or completion
    pub async fn open_count(&self) -> Result<u64, ServiceError> {
        Ok(return_request::Entity::find()
            .filter(
                return_request::Column::Status
                    .is_in([ReturnStatus::Requested, ReturnStatus::Approved]),
            )
            .count(&*self.db)
            .await?)
    }
}
