use crate::{
    db::QueryBuilder,
    entities::{feedback, product},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{orders::find_order, PageRequest, Viewer},
    PaginatedResponse,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SubmitFeedbackRequest {
    pub order_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

/// Public feedback for a product with its rating summary
#[derive(Debug, Clone, Serialize)]
pub struct ProductFeedback {
    pub product_id: Uuid,
    pub average_rating: Option<f64>,
    pub count: usize,
    pub entries: Vec<feedback::Model>,
}

#[derive(Debug, Clone, Default)]
pub struct FeedbackFilter {
    pub product_id: Option<Uuid>,
    pub min_rating: Option<i32>,
    pub max_rating: Option<i32>,
    pub page: PageRequest,
}

/// Mean of the ratings rounded to two decimals; `None` when there are none
pub fn average_rating(ratings: &[i32]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    let mean = sum as f64 / ratings.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}

#[derive(Clone)]
pub struct FeedbackService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl FeedbackService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn submit(
        &self,
        customer_id: Uuid,
        request: SubmitFeedbackRequest,
    ) -> Result<feedback::Model, ServiceError> {
        request.validate()?;
        if request.order_id.is_none() && request.product_id.is_none() {
            return Err(ServiceError::BadRequest(
                "feedback needs an order_id or a product_id".to_string(),
            ));
        }

        if let Some(order_id) = request.order_id {
            find_order(&*self.db, Viewer::Customer(customer_id), order_id).await?;
        }
        if let Some(product_id) = request.product_id {
            if product::Entity::find_by_id(product_id)
                .one(&*self.db)
                .await?
                .is_none()
            {
                return Err(ServiceError::NotFound(format!(
                    "Product {} not found",
                    product_id
                )));
            }
        }

        let entry = feedback::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            order_id: Set(request.order_id),
            product_id: Set(request.product_id),
            rating: Set(request.rating),
            comment: Set(request.comment),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::FeedbackSubmitted {
                feedback_id: entry.id,
                rating: entry.rating,
            })
            .await;
        Ok(entry)
    }

    #[instrument(skip(self))]
    pub async fn mine(&self, customer_id: Uuid) -> Result<Vec<feedback::Model>, ServiceError> {
        Ok(feedback::Entity::find()
            .filter(feedback::Column::CustomerId.eq(customer_id))
            .order_by_desc(feedback::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn for_product(&self, product_id: Uuid) -> Result<ProductFeedback, ServiceError> {
        product::Entity::find_by_id(product_id)
            .filter(product::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let entries = feedback::Entity::find()
            .filter(feedback::Column::ProductId.eq(product_id))
            .order_by_desc(feedback::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        let ratings: Vec<i32> = entries.iter().map(|f| f.rating).collect();

        Ok(ProductFeedback {
            product_id,
            average_rating: average_rating(&ratings),
            count: entries.len(),
            entries,
        })
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: FeedbackFilter,
    ) -> Result<PaginatedResponse<feedback::Model>, ServiceError> {
        let mut condition = Condition::all();
        if let Some(product_id) = filter.product_id {
            condition = condition.add(feedback::Column::ProductId.eq(product_id));
        }
        if let Some(min_rating) = filter.min_rating {
            condition = condition.add(feedback::Column::Rating.gte(min_rating));
        }
        if let Some(max_rating) = filter.max_rating {
            condition = condition.add(feedback::Column::Rating.lte(max_rating));
        }

        let (items, total) = QueryBuilder::<feedback::Entity>::new()
            .filter(condition)
            .order_by(feedback::Column::CreatedAt, true)
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_is_rounded() {
        assert_eq!(average_rating(&[]), None);
        assert_eq!(average_rating(&[5]), Some(5.0));
        assert_eq!(average_rating(&[4, 5, 5]), Some(4.67));
    }
}
