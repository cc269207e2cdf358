use crate::{
    errors::ServiceError,
    services::{
        inventory::InventoryService, orders::OrderService, payments::PaymentService,
        prescriptions::PrescriptionService, returns::ReturnService,
    },
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::instrument;
use utoipa::ToSchema;

/// Staff overview of work waiting across the pharmacy
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardSummary {
    pub pending_prescriptions: u64,
    pub low_stock_items: u64,
    pub open_returns: u64,
    pub orders_by_status: BTreeMap<String, u64>,
    pub total_orders: u64,
    #[schema(value_type = String)]
    pub revenue: Decimal,
    pub generated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct DashboardService {
    prescriptions: PrescriptionService,
    inventory: InventoryService,
    returns: ReturnService,
    orders: OrderService,
    payments: PaymentService,
}

impl DashboardService {
    pub fn new(
        prescriptions: PrescriptionService,
        inventory: InventoryService,
        returns: ReturnService,
        orders: OrderService,
        payments: PaymentService,
    ) -> Self {
        Self {
            prescriptions,
            inventory,
            returns,
            orders,
            payments,
        }
    }

    #[instrument(skip(self))]
    pub async fn summary(&self) -> Result<DashboardSummary, ServiceError> {
        let orders_by_status = self.orders.count_by_status().await?;
        Ok(DashboardSummary {
            pending_prescriptions: self.prescriptions.pending_count().await?,
            low_stock_items: self.inventory.low_stock_count().await?,
            open_returns: self.returns.open_count().await?,
            total_orders: orders_by_status.values().sum(),
            orders_by_status,
            revenue: self.payments.revenue().await?,
            generated_at: Utc::now(),
        })
    }
}
