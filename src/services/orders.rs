use crate::{
    db::QueryBuilder,
    entities::{
        branch, cart_item, order, order_item, payment, OrderStatus, PaymentRecordStatus, PaymentStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        cart::load_lines,
        export::CsvBuilder,
        inventory::{restock, take_stock},
        prescriptions::ensure_prescription_gate,
        PageRequest, Viewer,
    },
    PaginatedResponse,
};
use chrono::{DateTime, NaiveDate, Utc};
use metrics::counter;
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    pub branch_id: Uuid,
    #[validate(length(min = 1, max = 500))]
    pub delivery_address: String,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    #[validate(length(min = 1, max = 100))]
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<NaiveDate>,
}

/// Order with its lines and payments
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
    pub payments: Vec<payment::Model>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrackingStep {
    pub status: OrderStatus,
    pub reached: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderTracking {
    pub order_id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<NaiveDate>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled: bool,
    pub steps: Vec<TrackingStep>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub branch_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: PageRequest,
}

impl OrderFilter {
    fn condition(&self, viewer: Viewer) -> Condition {
        let mut condition = Condition::all();
        match viewer.customer_scope() {
            Some(customer_id) => {
                condition = condition.add(order::Column::CustomerId.eq(customer_id));
            }
            None => {
                if let Some(customer_id) = self.customer_id {
                    condition = condition.add(order::Column::CustomerId.eq(customer_id));
                }
                if let Some(branch_id) = self.branch_id {
                    condition = condition.add(order::Column::BranchId.eq(branch_id));
                }
            }
        }
        if let Some(status) = self.status {
            condition = condition.add(order::Column::Status.eq(status));
        }
        if let Some(from) = self.from {
            condition = condition.add(order::Column::CreatedAt.gte(from));
        }
        if let Some(to) = self.to {
            condition = condition.add(order::Column::CreatedAt.lte(to));
        }
        condition
    }
}

/// `RX-YYYYMMDD-XXXXXX` with an uppercase alphanumeric suffix
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("RX-{}-{}", now.format("%Y%m%d"), suffix)
}

/// Delivery progression with the steps the order has reached
pub fn tracking_steps(status: OrderStatus) -> Vec<TrackingStep> {
    let reached_until = match status {
        OrderStatus::Cancelled => Some(0),
        other => other.step_index(),
    };
    OrderStatus::DELIVERY_STEPS
        .iter()
        .enumerate()
        .map(|(idx, step)| TrackingStep {
            status: *step,
            reached: reached_until.map_or(false, |until| idx <= until),
        })
        .collect()
}

pub(crate) async fn find_order<C: ConnectionTrait>(
    conn: &C,
    viewer: Viewer,
    id: Uuid,
) -> Result<order::Model, ServiceError> {
    order::Entity::find_by_id(id)
        .one(conn)
        .await?
        .filter(|o| viewer.can_see(o.customer_id))
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    async fn detail(&self, order: order::Model) -> Result<OrderDetail, ServiceError> {
        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        let payments = payment::Entity::find()
            .filter(payment::Column::OrderId.eq(order.id))
            .order_by_asc(payment::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(OrderDetail {
            order,
            items,
            payments,
        })
    }

    /// Turns the customer's cart into a pending order at one branch
    #[instrument(skip(self, request), fields(branch_id = %request.branch_id))]
    pub async fn checkout(
        &self,
        customer_id: Uuid,
        request: CheckoutRequest,
    ) -> Result<OrderDetail, ServiceError> {
        request.validate()?;

        let txn = self.db.begin().await?;

        let lines = load_lines(&txn, customer_id).await?;
        if lines.is_empty() {
            return Err(ServiceError::BadRequest("cart is empty".to_string()));
        }

        branch::Entity::find_by_id(request.branch_id)
            .filter(branch::Column::IsActive.eq(true))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Branch {} not found", request.branch_id))
            })?;

        for (_, product) in &lines {
            if !product.is_active {
                return Err(ServiceError::NotFound(format!(
                    "Product {} is no longer available",
                    product.id
                )));
            }
            ensure_prescription_gate(&txn, customer_id, product).await?;
        }

        for (line, product) in &lines {
            if !take_stock(&txn, request.branch_id, product.id, line.quantity).await? {
                warn!(product_id = %product.id, requested = line.quantity, "checkout rejected: stock short");
                return Err(ServiceError::InsufficientStock(format!(
                    "not enough {} in stock at this branch",
                    product.name
                )));
            }
        }

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let total_amount: Decimal = lines
            .iter()
            .map(|(line, product)| product.price * Decimal::from(line.quantity))
            .sum();

        let order = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(generate_order_number(now)),
            customer_id: Set(customer_id),
            branch_id: Set(request.branch_id),
            status: Set(OrderStatus::Pending),
            payment_status: Set(PaymentStatus::Unpaid),
            total_amount: Set(total_amount),
            delivery_address: Set(request.delivery_address.trim().to_string()),
            tracking_number: Set(None),
            estimated_delivery: Set(None),
            delivered_at: Set(None),
            notes: Set(request.notes),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for (line, product) in &lines {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(product.id),
                product_name: Set(product.name.clone()),
                quantity: Set(line.quantity),
                unit_price: Set(product.price),
                line_total: Set(product.price * Decimal::from(line.quantity)),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
            items.push(item);
        }

        cart_item::Entity::delete_many()
            .filter(cart_item::Column::CustomerId.eq(customer_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        counter!("pharmacy.orders.placed", 1);
        self.event_sender
            .send_or_log(Event::OrderPlaced {
                order_id,
                customer_id,
                total_amount,
            })
            .await;
        info!(%order_id, order_number = %order.order_number, %total_amount, "order placed");

        Ok(OrderDetail {
            order,
            items,
            payments: Vec::new(),
        })
    }

    /// Orders newest first; customers only ever see their own
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        viewer: Viewer,
        filter: OrderFilter,
    ) -> Result<PaginatedResponse<order::Model>, ServiceError> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(ServiceError::BadRequest(
                    "from must not be after to".to_string(),
                ));
            }
        }

        let (items, total) = QueryBuilder::<order::Entity>::new()
            .filter(filter.condition(viewer))
            .order_by(order::Column::CreatedAt, true)
            .order_by(order::Column::Id, false)
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
    pub async fn get(&self, viewer: Viewer, id: Uuid) -> Result<OrderDetail, ServiceError> {
        let order = find_order(&*self.db, viewer, id).await?;
        self.detail(order).await
    }

    /// Cancels an order, returning its stock and refunding any payment
    #[instrument(skip(self))]
    pub async fn cancel(&self, viewer: Viewer, id: Uuid) -> Result<OrderDetail, ServiceError> {
        let txn = self.db.begin().await?;
        let existing = find_order(&txn, viewer, id).await?;

        let allowed = if viewer.is_staff() {
            existing.status.cancellable_by_staff()
        } else {
            existing.status.cancellable_by_customer()
        };
        if !allowed {
            return Err(ServiceError::InvalidOperation(format!(
                "an order that is {} cannot be cancelled",
                existing.status
            )));
        }

        let old_status = existing.status;
        let refunded = existing.payment_status == PaymentStatus::Paid;
        let new_payment_status = if refunded {
            PaymentStatus::Refunded
        } else {
            existing.payment_status
        };
        let cancelled = order::Entity::update_many()
            .col_expr(order::Column::Status, Expr::value(OrderStatus::Cancelled))
            .col_expr(order::Column::PaymentStatus, Expr::value(new_payment_status))
            .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(order::Column::Id.eq(id))
            .filter(order::Column::Status.eq(old_status))
            .filter(order::Column::PaymentStatus.eq(existing.payment_status))
            .exec(&txn)
            .await?;
        if cancelled.rows_affected != 1 {
            return Err(ServiceError::Conflict(
                "order was modified concurrently".to_string(),
            ));
        }

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(id))
            .all(&txn)
            .await?;
        for item in &items {
            restock(&txn, existing.branch_id, item.product_id, item.quantity).await?;
        }

        if refunded {
            payment::Entity::update_many()
                .col_expr(
                    payment::Column::Status,
                    Expr::value(PaymentRecordStatus::Refunded),
                )
                .filter(payment::Column::OrderId.eq(id))
                .filter(payment::Column::Status.eq(PaymentRecordStatus::Completed))
                .exec(&txn)
                .await?;
        }

        let order = find_order(&txn, Viewer::Staff, id).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id: id,
                old_status,
                new_status: OrderStatus::Cancelled,
            })
            .await;
        self.event_sender
            .send_or_log(Event::OrderCancelled {
                order_id: id,
                refunded,
            })
            .await;
        info!(order_id = %id, refunded, "order cancelled");

        self.detail(order).await
    }

    /// Moves an order along the delivery progression
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: Uuid,
        request: UpdateOrderStatusRequest,
    ) -> Result<order::Model, ServiceError> {
        request.validate()?;
        let existing = find_order(&*self.db, Viewer::Staff, id).await?;
        let old_status = existing.status;

        if !old_status.can_transition_to(request.status) {
            return Err(ServiceError::InvalidOperation(format!(
                "cannot move an order from {} to {}",
                old_status, request.status
            )));
        }

        let tracking_number = request
            .tracking_number
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .or_else(|| existing.tracking_number.clone());
        if request.status == OrderStatus::OutForDelivery && tracking_number.is_none() {
            return Err(ServiceError::ValidationError(
                "a tracking number is required before dispatch".to_string(),
            ));
        }

        let now = Utc::now();
        let mut update = order::Entity::update_many()
            .col_expr(order::Column::Status, Expr::value(request.status))
            .col_expr(order::Column::TrackingNumber, Expr::value(tracking_number))
            .col_expr(order::Column::UpdatedAt, Expr::value(now));
        if let Some(estimated_delivery) = request.estimated_delivery {
            update = update.col_expr(
                order::Column::EstimatedDelivery,
                Expr::value(Some(estimated_delivery)),
            );
        }
        if request.status == OrderStatus::Delivered {
            update = update.col_expr(order::Column::DeliveredAt, Expr::value(Some(now)));
        }
        let moved = update
            .filter(order::Column::Id.eq(id))
            .filter(order::Column::Status.eq(old_status))
            .exec(&*self.db)
            .await?;
        if moved.rows_affected != 1 {
            return Err(ServiceError::Conflict(
                "order was modified concurrently".to_string(),
            ));
        }
        let order = find_order(&*self.db, Viewer::Staff, id).await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id: id,
                old_status,
                new_status: order.status,
            })
            .await;
        info!(order_id = %id, from = %old_status, to = %order.status, "order status updated");
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn tracking(&self, viewer: Viewer, id: Uuid) -> Result<OrderTracking, ServiceError> {
        let order = find_order(&*self.db, viewer, id).await?;
        Ok(OrderTracking {
            order_id: order.id,
            steps: tracking_steps(order.status),
            cancelled: order.status == OrderStatus::Cancelled,
            order_number: order.order_number,
            status: order.status,
            tracking_number: order.tracking_number,
            estimated_delivery: order.estimated_delivery,
            delivered_at: order.delivered_at,
        })
    }

    /// All orders as CSV, newest first
    #[instrument(skip(self))]
    pub async fn export_csv(&self) -> Result<String, ServiceError> {
        let orders = order::Entity::find()
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let mut csv = CsvBuilder::with_header(&[
            "order_number",
            "customer_id",
            "branch_id",
            "status",
            "payment_status",
            "total_amount",
            "created_at",
        ]);
        for order in &orders {
            csv.row([
                order.order_number.clone(),
                order.customer_id.to_string(),
                order.branch_id.to_string(),
                order.status.to_string(),
                order.payment_status.to_string(),
                order.total_amount.to_string(),
                order.created_at.to_rfc3339(),
            ]);
        }
        Ok(csv.finish())
    }

    /// Order counts keyed by status
    pub async fn count_by_status(&self) -> Result<BTreeMap<String, u64>, ServiceError> {
        let statuses: Vec<OrderStatus> = order::Entity::find()
            .select_only()
            .column(order::Column::Status)
            .into_tuple()
            .all(&*self.db)
            .await?;

        let mut counts = BTreeMap::new();
        for status in statuses {
            *counts.entry(status.to_string()).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_format() {
        let now = DateTime::parse_from_rfc3339("2024-03-09T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let number = generate_order_number(now);
        assert!(number.starts_with("RX-20240309-"));
        let suffix = &number["RX-20240309-".len()..];
        assert_eq!(suffix.len(), 6);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn tracking_marks_reached_steps() {
        let steps = tracking_steps(OrderStatus::Processing);
        let reached: Vec<bool> = steps.iter().map(|s| s.reached).collect();
        assert_eq!(reached, vec![true, true, true, false, false]);

        let delivered = tracking_steps(OrderStatus::Delivered);
        assert!(delivered.iter().all(|s| s.reached));

        let cancelled = tracking_steps(OrderStatus::Cancelled);
        assert_eq!(cancelled.iter().filter(|s| s.reached).count(), 1);
    }
}
