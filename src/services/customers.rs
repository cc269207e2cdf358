use crate::{
    db::{QueryBuilder, SearchBuilder},
    entities::customer,
    errors::ServiceError,
    services::PageRequest,
    PaginatedResponse,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct CustomerService {
    db: Arc<DatabaseConnection>,
}

impl CustomerService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<customer::Model, ServiceError> {
        customer::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateCustomerRequest,
    ) -> Result<customer::Model, ServiceError> {
        request.validate()?;
        if let Some(dob) = request.date_of_birth {
            if dob > Utc::now().date_naive() {
                return Err(ServiceError::ValidationError(
                    "date_of_birth cannot be in the future".to_string(),
                ));
            }
        }

        let mut active: customer::ActiveModel = self.get(id).await?.into();
        if let Some(first_name) = request.first_name {
            active.first_name = Set(first_name.trim().to_string());
        }
        if let Some(last_name) = request.last_name {
            active.last_name = Set(last_name.trim().to_string());
        }
        if let Some(phone) = request.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(address) = request.address {
            active.address = Set(Some(address));
        }
        if let Some(dob) = request.date_of_birth {
            active.date_of_birth = Set(Some(dob));
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }

    /// Staff directory search over name and email
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        search: Option<String>,
        page: PageRequest,
    ) -> Result<PaginatedResponse<customer::Model>, ServiceError> {
        let search = search.unwrap_or_default();
        let condition = SearchBuilder::new()
            .add_like(customer::Column::FirstName, &search)
            .add_like(customer::Column::LastName, &search)
            .add_like(customer::Column::Email, &search)
            .build();

        let (items, total) = QueryBuilder::from_select(customer::Entity::find())
            .filter_opt(condition)
            .order_by(customer::Column::LastName, false)
            .order_by(customer::Column::FirstName, false)
            .paginate(page.page, page.limit)
            .execute(&*self.db)
            .await?;

        Ok(PaginatedResponse::new(items, total, page.page, page.limit))
    }
}
