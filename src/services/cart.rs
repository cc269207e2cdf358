use crate::{
    entities::{cart_item, product},
    errors::ServiceError,
    services::prescriptions::ensure_prescription_gate,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Largest quantity a single cart line may hold
pub const MAX_LINE_QUANTITY: i32 = 999;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 999))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SetQuantityRequest {
    #[validate(range(min = 0, max = 999))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub product_name: String,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub line_total: Decimal,
    pub requires_prescription: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartLine>,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    pub item_count: i64,
}

/// Cart lines joined with their products, oldest line first
pub async fn load_lines<C: ConnectionTrait>(
    conn: &C,
    customer_id: Uuid,
) -> Result<Vec<(cart_item::Model, product::Model)>, ServiceError> {
    let lines = cart_item::Entity::find()
        .filter(cart_item::Column::CustomerId.eq(customer_id))
        .order_by_asc(cart_item::Column::CreatedAt)
        .all(conn)
        .await?;
    if lines.is_empty() {
        return Ok(Vec::new());
    }

    let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
    let mut products: HashMap<Uuid, product::Model> = product::Entity::find()
        .filter(product::Column::Id.is_in(product_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    Ok(lines
        .into_iter()
        .filter_map(|line| {
            let product = products.remove(&line.product_id)?;
            Some((line, product))
        })
        .collect())
}

fn view(lines: Vec<(cart_item::Model, product::Model)>) -> CartView {
    let items: Vec<CartLine> = lines
        .into_iter()
        .map(|(line, product)| CartLine {
            id: line.id,
            product_id: product.id,
            sku: product.sku,
            product_name: product.name,
            unit_price: product.price,
            quantity: line.quantity,
            line_total: product.price * Decimal::from(line.quantity),
            requires_prescription: product.requires_prescription,
        })
        .collect();

    CartView {
        subtotal: items.iter().map(|l| l.line_total).sum(),
        item_count: items.iter().map(|l| i64::from(l.quantity)).sum(),
        items,
    }
}

#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, customer_id: Uuid) -> Result<CartView, ServiceError> {
        Ok(view(load_lines(&*self.db, customer_id).await?))
    }

    async fn find_line(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<cart_item::Model>, ServiceError> {
        Ok(cart_item::Entity::find()
            .filter(cart_item::Column::CustomerId.eq(customer_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?)
    }

    /// Adds a product, incrementing an existing line. Gated products need a valid prescription.
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        customer_id: Uuid,
        request: AddToCartRequest,
    ) -> Result<CartView, ServiceError> {
        request.validate()?;

        let product = product::Entity::find_by_id(request.product_id)
            .filter(product::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", request.product_id))
            })?;

        ensure_prescription_gate(&*self.db, customer_id, &product).await?;

        let now = Utc::now();
        match self.find_line(customer_id, product.id).await? {
            Some(line) => {
                let quantity = line.quantity + request.quantity;
                if quantity > MAX_LINE_QUANTITY {
                    return Err(ServiceError::ValidationError(format!(
                        "a cart line may hold at most {} units",
                        MAX_LINE_QUANTITY
                    )));
                }
                let mut active: cart_item::ActiveModel = line.into();
                active.quantity = Set(quantity);
                active.updated_at = Set(now);
                active.update(&*self.db).await?;
            }
            None => {
                cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    customer_id: Set(customer_id),
                    product_id: Set(product.id),
                    quantity: Set(request.quantity),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&*self.db)
                .await?;
            }
        }

        debug!(%customer_id, product_id = %product.id, "cart line added");
        self.get(customer_id).await
    }

    /// Sets a line's quantity; zero removes it
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        request: SetQuantityRequest,
    ) -> Result<CartView, ServiceError> {
        request.validate()?;
        let line = self
            .find_line(customer_id, product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product is not in the cart".to_string()))?;

        if request.quantity == 0 {
            cart_item::Entity::delete_by_id(line.id)
                .exec(&*self.db)
                .await?;
        } else {
            let mut active: cart_item::ActiveModel = line.into();
            active.quantity = Set(request.quantity);
            active.updated_at = Set(Utc::now());
            active.update(&*self.db).await?;
        }
        self.get(customer_id).await
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, customer_id: Uuid, product_id: Uuid) -> Result<CartView, ServiceError> {
        let result = cart_item::Entity::delete_many()
            .filter(cart_item::Column::CustomerId.eq(customer_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(
                "Product is not in the cart".to_string(),
            ));
        }
        self.get(customer_id).await
    }

    #[instrument(skip(self))]
    pub async fn clear(&self, customer_id: Uuid) -> Result<(), ServiceError> {
        cart_item::Entity::delete_many()
            .filter(cart_item::Column::CustomerId.eq(customer_id))
            .exec(&*self.db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(product_id: Uuid, quantity: i32, price: Decimal) -> (cart_item::Model, product::Model) {
        let now = Utc::now();
        (
            cart_item::Model {
                id: Uuid::new_v4(),
                customer_id: Uuid::new_v4(),
                product_id,
                quantity,
                created_at: now,
                updated_at: now,
            },
            product::Model {
                id: product_id,
                sku: "SKU".into(),
                name: "Paracetamol".into(),
                description: None,
                category: "analgesics".into(),
                manufacturer: None,
                price,
                requires_prescription: false,
                is_active: true,
                created_at: now,
                updated_at: now,
            },
        )
    }

    #[test]
    fn view_totals_lines() {
        let cart = view(vec![
            line(Uuid::new_v4(), 2, dec!(4.25)),
            line(Uuid::new_v4(), 1, dec!(12.50)),
        ]);
        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.items[0].line_total, dec!(8.50));
        assert_eq!(cart.subtotal, dec!(21.00));
        assert_eq!(cart.item_count, 3);
    }

    #[test]
    fn empty_cart_view() {
        let cart = view(Vec::new());
        assert!(cart.items.is_empty());
        assert_eq!(cart.subtotal, Decimal::ZERO);
        assert_eq!(cart.item_count, 0);
    }
}
