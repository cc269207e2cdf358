use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::{OrderStatus, PrescriptionStatus, ReturnStatus, UserRole};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is closed.
    /// Events are informational; a dropped event never fails the request that raised it.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "domain event dropped");
        }
    }
}

/// Domain events raised by the services after their writes commit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    UserRegistered {
        user_id: Uuid,
        role: UserRole,
    },
    UserLoggedIn(Uuid),

    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeactivated(Uuid),

    InventoryUpdated {
        branch_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    },
    InventoryAdjusted {
        inventory_id: Uuid,
        old_quantity: i32,
        new_quantity: i32,
        reason: String,
    },
    LowStockDetected {
        branch_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        reorder_level: i32,
    },

    OrderPlaced {
        order_id: Uuid,
        customer_id: Uuid,
        total_amount: Decimal,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    OrderCancelled {
        order_id: Uuid,
        refunded: bool,
    },

    PaymentRecorded {
        payment_id: Uuid,
        order_id: Uuid,
        amount: Decimal,
    },

    PrescriptionUploaded(Uuid),
    PrescriptionReviewed {
        prescription_id: Uuid,
        status: PrescriptionStatus,
        reviewed_by: Uuid,
    },

    FeedbackSubmitted {
        feedback_id: Uuid,
        rating: i32,
    },

    ReturnRequested(Uuid),
    ReturnStatusChanged {
        return_id: Uuid,
        status: ReturnStatus,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// Stable name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Event::UserRegistered { .. } => "user.registered",
            Event::UserLoggedIn(_) => "user.logged_in",
            Event::ProductCreated(_) => "product.created",
            Event::ProductUpdated(_) => "product.updated",
            Event::ProductDeactivated(_) => "product.deactivated",
            Event::InventoryUpdated { .. } => "inventory.updated",
            Event::InventoryAdjusted { .. } => "inventory.adjusted",
            Event::LowStockDetected { .. } => "inventory.low_stock",
            Event::OrderPlaced { .. } => "order.placed",
            Event::OrderStatusChanged { .. } => "order.status_changed",
            Event::OrderCancelled { .. } => "order.cancelled",
            Event::PaymentRecorded { .. } => "payment.recorded",
            Event::PrescriptionUploaded(_) => "prescription.uploaded",
            Event::PrescriptionReviewed { .. } => "prescription.reviewed",
            Event::FeedbackSubmitted { .. } => "feedback.submitted",
            Event::ReturnRequested(_) => "return.requested",
            Event::ReturnStatusChanged { .. } => "return.status_changed",
        }
    }
}

/// Creates the bounded event channel shared by every service
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender::new(tx), rx)
}

/// Drains the event channel until every sender is dropped
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::LowStockDetected {
                branch_id,
                product_id,
                quantity,
                reorder_level,
            } => {
                warn!(
                    event = event.name(),
                    %branch_id,
                    %product_id,
                    quantity,
                    reorder_level,
                    "stock at or below reorder level"
                );
            }
            _ => {
                let payload = serde_json::to_string(&event).unwrap_or_default();
                info!(event = event.name(), %payload, "domain event");
            }
        }
    }

    info!("Event processing loop stopped");
}
