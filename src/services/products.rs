use crate::{
    db::{QueryBuilder, SearchBuilder},
    entities::{branch, cart_item, inventory, product},
    errors::ServiceError,
    events::{Event, EventSender},
    services::PageRequest,
    PaginatedResponse,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Query, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn validate_positive_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price <= Decimal::ZERO {
        let mut err = ValidationError::new("price");
        err.message = Some("price must be greater than zero".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    #[validate(length(max = 200))]
    pub manufacturer: Option<String>,
    #[validate(custom = "validate_positive_price")]
    #[schema(value_type = String, example = "12.50")]
    pub price: Decimal,
    #[serde(default)]
    pub requires_prescription: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 64))]
    pub sku: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    #[validate(length(max = 200))]
    pub manufacturer: Option<String>,
    #[validate(custom = "validate_positive_price")]
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub requires_prescription: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    #[default]
    Name,
    Price,
    CreatedAt,
}

impl ProductSort {
    pub fn parse(value: Option<&str>) -> Result<Self, ServiceError> {
        match value.map(str::trim) {
            None | Some("") | Some("name") => Ok(Self::Name),
            Some("price") => Ok(Self::Price),
            Some("created_at") => Ok(Self::CreatedAt),
            Some(other) => Err(ServiceError::BadRequest(format!(
                "unsupported sort_by '{}'; expected name, price or created_at",
                other
            ))),
        }
    }

    fn column(&self) -> product::Column {
        match self {
            Self::Name => product::Column::Name,
            Self::Price => product::Column::Price,
            Self::CreatedAt => product::Column::CreatedAt,
        }
    }
}

/// Catalog search parameters
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub categories: Vec<String>,
    pub requires_prescription: Option<bool>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub branch_id: Option<Uuid>,
    pub in_stock: bool,
    pub include_inactive: bool,
    pub sort: ProductSort,
    pub descending: bool,
    pub page: PageRequest,
}

impl ProductFilter {
    fn condition(&self) -> Condition {
        let mut condition = Condition::all();

        if !self.include_inactive {
            condition = condition.add(product::Column::IsActive.eq(true));
        }
        if let Some(search) = self.search.as_deref() {
            if let Some(search) = SearchBuilder::new()
                .add_like(product::Column::Name, search)
                .add_like(product::Column::Sku, search)
                .add_like(product::Column::Manufacturer, search)
                .build()
            {
                condition = condition.add(search);
            }
        }
        if !self.categories.is_empty() {
            condition = condition.add(product::Column::Category.is_in(self.categories.clone()));
        }
        if let Some(requires_prescription) = self.requires_prescription {
            condition =
                condition.add(product::Column::RequiresPrescription.eq(requires_prescription));
        }
        if let Some(min_price) = self.min_price {
            condition = condition.add(product::Column::Price.gte(min_price));
        }
        if let Some(max_price) = self.max_price {
            condition = condition.add(product::Column::Price.lte(max_price));
        }
        if self.in_stock {
            let mut stocked = Query::select();
            stocked
                .column(inventory::Column::ProductId)
                .from(inventory::Entity)
                .and_where(inventory::Column::Quantity.gt(0));
            if let Some(branch_id) = self.branch_id {
                stocked.and_where(inventory::Column::BranchId.eq(branch_id));
            }
            condition = condition.add(product::Column::Id.in_subquery(stocked.to_owned()));
        }

        condition
    }
}

/// Stock of a product at one branch
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BranchAvailability {
    pub branch_id: Uuid,
    pub branch_name: String,
    pub quantity: i32,
    pub in_stock: bool,
}

/// Product with its per-branch availability
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: product::Model,
    pub total_quantity: i64,
    pub availability: Vec<BranchAvailability>,
}

/// Product catalog operations
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: ProductFilter,
    ) -> Result<PaginatedResponse<product::Model>, ServiceError> {
        if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
            if min > max {
                return Err(ServiceError::BadRequest(
                    "min_price cannot exceed max_price".to_string(),
                ));
            }
        }

        let (items, total) = QueryBuilder::<product::Entity>::new()
            .filter(filter.condition())
            .order_by(filter.sort.column(), filter.descending)
            .order_by(product::Column::Id, false)
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

    /// Distinct categories of active products, sorted
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<String>, ServiceError> {
        let categories = product::Entity::find()
            .select_only()
            .column(product::Column::Category)
            .distinct()
            .filter(product::Column::IsActive.eq(true))
            .order_by_asc(product::Column::Category)
            .into_tuple::<String>()
            .all(&*self.db)
            .await?;
        Ok(categories)
    }

    /// Active product by id (404 when missing or deactivated)
    pub async fn get_active(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .filter(product::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    async fn get_any(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    /// Product detail merged with stock at every active branch
    #[instrument(skip(self))]
    pub async fn get_detail(
        &self,
        id: Uuid,
        include_inactive: bool,
    ) -> Result<ProductDetail, ServiceError> {
        let product = if include_inactive {
            self.get_any(id).await?
        } else {
            self.get_active(id).await?
        };

        let stock: HashMap<Uuid, i32> = inventory::Entity::find()
            .filter(inventory::Column::ProductId.eq(id))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|row| (row.branch_id, row.quantity))
            .collect();

        let availability: Vec<BranchAvailability> = branch::Entity::find()
            .filter(branch::Column::IsActive.eq(true))
            .order_by_asc(branch::Column::Name)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|branch| {
                let quantity = stock.get(&branch.id).copied().unwrap_or(0);
                BranchAvailability {
                    branch_id: branch.id,
                    branch_name: branch.name,
                    quantity,
                    in_stock: quantity > 0,
                }
            })
            .collect();

        let total_quantity = availability.iter().map(|a| i64::from(a.quantity)).sum();

        Ok(ProductDetail {
            product,
            total_quantity,
            availability,
        })
    }

    async fn ensure_sku_available(&self, sku: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query = product::Entity::find().filter(product::Column::Sku.eq(sku));
        if let Some(id) = except {
            query = query.filter(product::Column::Id.ne(id));
        }
        if query.one(&*self.db).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "a product with SKU {} already exists",
                sku
            )));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn create(&self, request: CreateProductRequest) -> Result<product::Model, ServiceError> {
        request.validate()?;
        let sku = request.sku.trim().to_uppercase();
        self.ensure_sku_available(&sku, None).await?;

        let now = Utc::now();
        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(sku),
            name: Set(request.name.trim().to_string()),
            description: Set(request.description),
            category: Set(request.category.trim().to_string()),
            manufacturer: Set(request.manufacturer),
            price: Set(request.price),
            requires_prescription: Set(request.requires_prescription),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(product.id))
            .await;
        info!(product_id = %product.id, sku = %product.sku, "product created");
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;
        let existing = self.get_any(id).await?;
        let mut product: product::ActiveModel = existing.into();

        if let Some(sku) = request.sku {
            let sku = sku.trim().to_uppercase();
            self.ensure_sku_available(&sku, Some(id)).await?;
            product.sku = Set(sku);
        }
        if let Some(name) = request.name {
            product.name = Set(name.trim().to_string());
        }
        if let Some(description) = request.description {
            product.description = Set(Some(description));
        }
        if let Some(category) = request.category {
            product.category = Set(category.trim().to_string());
        }
        if let Some(manufacturer) = request.manufacturer {
            product.manufacturer = Set(Some(manufacturer));
        }
        if let Some(price) = request.price {
            product.price = Set(price);
        }
        if let Some(requires_prescription) = request.requires_prescription {
            product.requires_prescription = Set(requires_prescription);
        }
        if let Some(is_active) = request.is_active {
            product.is_active = Set(is_active);
        }
        product.updated_at = Set(Utc::now());

        let product = product.update(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::ProductUpdated(product.id))
            .await;
        Ok(product)
    }

    /// Soft delete: the product is hidden from the catalog and removed from every cart
    #[instrument(skip(self))]
    pub async fn deactivate(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get_any(id).await?;

        let txn = self.db.begin().await?;

        let mut product: product::ActiveModel = existing.into();
        product.is_active = Set(false);
        product.updated_at = Set(Utc::now());
        product.update(&txn).await?;

        let removed = cart_item::Entity::delete_many()
            .filter(cart_item::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::ProductDeactivated(id))
            .await;
        info!(product_id = %id, cart_lines_removed = removed.rows_affected, "product deactivated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_parsing() {
        assert_eq!(ProductSort::parse(None).unwrap(), ProductSort::Name);
        assert_eq!(ProductSort::parse(Some("price")).unwrap(), ProductSort::Price);
        assert_eq!(
            ProductSort::parse(Some("created_at")).unwrap(),
            ProductSort::CreatedAt
        );
        assert!(ProductSort::parse(Some("popularity")).is_err());
    }

    #[test]
    fn price_must_be_positive() {
        assert!(validate_positive_price(&Decimal::ZERO).is_err());
        assert!(validate_positive_price(&Decimal::new(-1, 0)).is_err());
        assert!(validate_positive_price(&Decimal::new(1250, 2)).is_ok());
    }
}
