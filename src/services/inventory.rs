use crate::{
    db::QueryBuilder,
    entities::{branch, inventory, product},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{export::CsvBuilder, PageRequest},
    PaginatedResponse,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::{Expr, Query},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpsertInventoryRequest {
    pub branch_id: Uuid,
    pub product_id: Uuid,
    #[validate(range(min = 0))]
    pub quantity: i32,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub reorder_level: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AdjustInventoryRequest {
    pub delta: i32,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

/// Inventory row merged with product and branch names
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InventoryView {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub branch_name: String,
    pub product_id: Uuid,
    pub sku: String,
    pub product_name: String,
    pub quantity: i32,
    pub reorder_level: i32,
    pub low_stock: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct InventoryFilter {
    pub branch_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub search: Option<String>,
    pub low_stock: bool,
    pub page: PageRequest,
}

impl InventoryFilter {
    fn condition(&self) -> Condition {
        let mut condition = Condition::all();
        if let Some(branch_id) = self.branch_id {
            condition = condition.add(inventory::Column::BranchId.eq(branch_id));
        }
        if let Some(product_id) = self.product_id {
            condition = condition.add(inventory::Column::ProductId.eq(product_id));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let matching = Query::select()
                .column(product::Column::Id)
                .from(product::Entity)
                .cond_where(
                    Condition::any()
                        .add(product::Column::Name.contains(search))
                        .add(product::Column::Sku.contains(search)),
                )
                .to_owned();
            condition = condition.add(inventory::Column::ProductId.in_subquery(matching));
        }
        if self.low_stock {
            condition = condition.add(low_stock_condition());
        }
        condition
    }
}

fn low_stock_condition() -> Condition {
    Condition::all()
        .add(Expr::col(inventory::Column::Quantity).lte(Expr::col(inventory::Column::ReorderLevel)))
}

/// Adds `quantity` units at a branch, creating the row when the branch never stocked the product.
pub async fn restock<C: ConnectionTrait>(
    conn: &C,
    branch_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> Result<(), ServiceError> {
    let updated = inventory::Entity::update_many()
        .col_expr(
            inventory::Column::Quantity,
            Expr::col(inventory::Column::Quantity).add(quantity),
        )
        .col_expr(inventory::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(inventory::Column::BranchId.eq(branch_id))
        .filter(inventory::Column::ProductId.eq(product_id))
        .exec(conn)
        .await?;

    if updated.rows_affected == 0 {
        inventory::ActiveModel {
            id: Set(Uuid::new_v4()),
            branch_id: Set(branch_id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            reorder_level: Set(0),
            updated_at: Set(Utc::now()),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

/// Removes `quantity` units at a branch only if that many are on hand.
/// Returns false when the stock was short and nothing changed.
pub async fn take_stock<C: ConnectionTrait>(
    conn: &C,
    branch_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> Result<bool, ServiceError> {
    let updated = inventory::Entity::update_many()
        .col_expr(
            inventory::Column::Quantity,
            Expr::col(inventory::Column::Quantity).sub(quantity),
        )
        .col_expr(inventory::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(inventory::Column::BranchId.eq(branch_id))
        .filter(inventory::Column::ProductId.eq(product_id))
        .filter(inventory::Column::Quantity.gte(quantity))
        .exec(conn)
        .await?;
    Ok(updated.rows_affected == 1)
}

/// Per-branch stock management
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Joins rows with their product and branch; rows whose parent vanished are skipped
    async fn merge(&self, rows: Vec<inventory::Model>) -> Result<Vec<InventoryView>, ServiceError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let product_ids: Vec<Uuid> = rows.iter().map(|r| r.product_id).collect();
        let branch_ids: Vec<Uuid> = rows.iter().map(|r| r.branch_id).collect();

        let products: HashMap<Uuid, product::Model> = product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let branches: HashMap<Uuid, String> = branch::Entity::find()
            .filter(branch::Column::Id.is_in(branch_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|b| (b.id, b.name))
            .collect();

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let product = products.get(&row.product_id)?;
                let branch_name = branches.get(&row.branch_id)?;
                Some(InventoryView {
                    id: row.id,
                    branch_id: row.branch_id,
                    branch_name: branch_name.clone(),
                    product_id: row.product_id,
                    sku: product.sku.clone(),
                    product_name: product.name.clone(),
                    quantity: row.quantity,
                    reorder_level: row.reorder_level,
                    low_stock: row.is_low_stock(),
                    updated_at: row.updated_at,
                })
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: InventoryFilter,
    ) -> Result<PaginatedResponse<InventoryView>, ServiceError> {
        let (rows, total) = QueryBuilder::<inventory::Entity>::new()
            .filter(filter.condition())
            .order_by(inventory::Column::BranchId, false)
            .order_by(inventory::Column::Id, false)
            .paginate(filter.page.page, filter.page.limit)
            .execute(&*self.db)
            .await?;

        let items = self.merge(rows).await?;
        Ok(PaginatedResponse::new(
            items,
            total,
            filter.page.page,
            filter.page.limit,
        ))
    }

    #[instrument(skip(self))]
    pub async fn low_stock(&self) -> Result<Vec<InventoryView>, ServiceError> {
        let rows = inventory::Entity::find()
            .filter(low_stock_condition())
            .order_by_asc(inventory::Column::Quantity)
            .all(&*self.db)
            .await?;
        self.merge(rows).await
    }

    /// Number of rows at or below their reorder level
    pub async fn low_stock_count(&self) -> Result<u64, ServiceError> {
        Ok(inventory::Entity::find()
            .filter(low_stock_condition())
            .count(&*self.db)
            .await?)
    }

    async fn single_view(&self, row: inventory::Model) -> Result<InventoryView, ServiceError> {
        let id = row.id;
        self.merge(vec![row])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::NotFound(format!("Inventory item {} not found", id)))
    }

    async fn notify_if_low(&self, row: &inventory::Model) {
        if row.is_low_stock() {
            warn!(
                branch_id = %row.branch_id,
                product_id = %row.product_id,
                quantity = row.quantity,
                "inventory at or below reorder level"
            );
            self.event_sender
                .send_or_log(Event::LowStockDetected {
                    branch_id: row.branch_id,
                    product_id: row.product_id,
                    quantity: row.quantity,
                    reorder_level: row.reorder_level,
                })
                .await;
        }
    }

    /// Creates or replaces the stock row for a (branch, product) pair
    #[instrument(skip(self))]
    pub async fn upsert(&self, request: UpsertInventoryRequest) -> Result<InventoryView, ServiceError> {
        request.validate()?;

        if branch::Entity::find_by_id(request.branch_id)
            .one(&*self.db)
            .await?
            .is_none()
        {
            return Err(ServiceError::NotFound(format!(
                "Branch {} not found",
                request.branch_id
            )));
        }
        if product::Entity::find_by_id(request.product_id)
            .one(&*self.db)
            .await?
            .is_none()
        {
            return Err(ServiceError::NotFound(format!(
                "Product {} not found",
                request.product_id
            )));
        }

        let existing = inventory::Entity::find()
            .filter(inventory::Column::BranchId.eq(request.branch_id))
            .filter(inventory::Column::ProductId.eq(request.product_id))
            .one(&*self.db)
            .await?;

        let row = match existing {
            Some(row) => {
                let mut active: inventory::ActiveModel = row.into();
                active.quantity = Set(request.quantity);
                active.reorder_level = Set(request.reorder_level);
                active.updated_at = Set(Utc::now());
                active.update(&*self.db).await?
            }
            None => {
                inventory::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    branch_id: Set(request.branch_id),
                    product_id: Set(request.product_id),
                    quantity: Set(request.quantity),
                    reorder_level: Set(request.reorder_level),
                    updated_at: Set(Utc::now()),
                }
                .insert(&*self.db)
                .await?
            }
        };

        self.event_sender
            .send_or_log(Event::InventoryUpdated {
                branch_id: row.branch_id,
                product_id: row.product_id,
                quantity: row.quantity,
            })
            .await;
        self.notify_if_low(&row).await;

        info!(inventory_id = %row.id, quantity = row.quantity, "inventory set");
        self.single_view(row).await
    }

    /// Applies a signed delta; the resulting quantity may not go negative
    #[instrument(skip(self))]
    pub async fn adjust(
        &self,
        id: Uuid,
        request: AdjustInventoryRequest,
    ) -> Result<InventoryView, ServiceError> {
        request.validate()?;
        if request.delta == 0 {
            return Err(ServiceError::ValidationError(
                "delta must not be zero".to_string(),
            ));
        }

        let delta = request.delta;
        let mut update = inventory::Entity::update_many()
            .col_expr(
                inventory::Column::Quantity,
                Expr::col(inventory::Column::Quantity).add(delta),
            )
            .col_expr(inventory::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(inventory::Column::Id.eq(id));
        update = if delta < 0 {
            update.filter(inventory::Column::Quantity.gte(-i64::from(delta)))
        } else {
            update.filter(inventory::Column::Quantity.lte(i64::from(i32::MAX) - i64::from(delta)))
        };

        let txn = self.db.begin().await?;
        let applied = update.exec(&txn).await?;
        let row = inventory::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Inventory item {} not found", id)))?;
        if applied.rows_affected != 1 {
            return Err(if delta < 0 {
                ServiceError::InsufficientStock(format!(
                    "only {} units on hand, cannot remove {}",
                    row.quantity,
                    -i64::from(delta)
                ))
            } else {
                ServiceError::BadRequest("quantity out of range".to_string())
            });
        }
        txn.commit().await?;

        let new_quantity = row.quantity;
        let old_quantity = new_quantity - delta;

        self.event_sender
            .send_or_log(Event::InventoryAdjusted {
                inventory_id: row.id,
                old_quantity,
                new_quantity,
                reason: request.reason,
            })
            .await;
        self.notify_if_low(&row).await;

        self.single_view(row).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = inventory::Entity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Inventory item {} not found",
                id
            )));
        }
        info!(inventory_id = %id, "inventory row deleted");
        Ok(())
    }

    /// Full merged inventory as CSV
    #[instrument(skip(self))]
    pub async fn export_csv(&self) -> Result<String, ServiceError> {
        let rows = inventory::Entity::find()
            .order_by_asc(inventory::Column::BranchId)
            .all(&*self.db)
            .await?;
        let mut views = self.merge(rows).await?;
        views.sort_by(|a, b| {
            a.branch_name
                .cmp(&b.branch_name)
                .then_with(|| a.sku.cmp(&b.sku))
        });

        let mut csv = CsvBuilder::with_header(&[
            "branch",
            "sku",
            "product",
            "quantity",
            "reorder_level",
            "low_stock",
            "updated_at",
        ]);
        for view in &views {
            csv.row([
                view.branch_name.clone(),
                view.sku.clone(),
                view.product_name.clone(),
                view.quantity.to_string(),
                view.reorder_level.to_string(),
                view.low_stock.to_string(),
                view.updated_at.to_rfc3339(),
            ]);
        }
        Ok(csv.finish())
    }
}
