use crate::{
    entities::branch,
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateBranchRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 500))]
    pub address: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateBranchRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

/// Pharmacy branch management
#[derive(Clone)]
pub struct BranchService {
    db: Arc<DatabaseConnection>,
}

impl BranchService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Branches ordered by name; inactive ones only when asked
    #[instrument(skip(self))]
    pub async fn list(&self, include_inactive: bool) -> Result<Vec<branch::Model>, ServiceError> {
        let mut query = branch::Entity::find().order_by_asc(branch::Column::Name);
        if !include_inactive {
            query = query.filter(branch::Column::IsActive.eq(true));
        }
        Ok(query.all(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<branch::Model, ServiceError> {
        branch::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Branch {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn create(&self, request: CreateBranchRequest) -> Result<branch::Model, ServiceError> {
        request.validate()?;
        let now = Utc::now();
        let branch = branch::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            address: Set(request.address.trim().to_string()),
            phone: Set(request.phone),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(branch_id = %branch.id, "branch created");
        Ok(branch)
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateBranchRequest,
    ) -> Result<branch::Model, ServiceError> {
        request.validate()?;
        let mut branch: branch::ActiveModel = self.get(id).await?.into();

        if let Some(name) = request.name {
            branch.name = Set(name.trim().to_string());
        }
        if let Some(address) = request.address {
            branch.address = Set(address.trim().to_string());
        }
        if let Some(phone) = request.phone {
            branch.phone = Set(Some(phone));
        }
        if let Some(is_active) = request.is_active {
            branch.is_active = Set(is_active);
        }
        branch.updated_at = Set(Utc::now());

        Ok(branch.update(&*self.db).await?)
    }
}
