use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};

/// Default page size for list endpoints
pub const DEFAULT_PAGE_SIZE: u64 = 20;
/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: u64 = 100;

/// Helper struct for building paginated list queries
pub struct QueryBuilder<E: EntityTrait> {
    query: Select<E>,
    page: u64,
    limit: u64,
}

impl<E: EntityTrait> Default for QueryBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EntityTrait> QueryBuilder<E> {
    /// Create a new query builder over every row of the entity
    pub fn new() -> Self {
        Self::from_select(E::find())
    }

    /// Start from an existing select (joins, custom filters)
    pub fn from_select(query: Select<E>) -> Self {
        Self {
            query,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }

    /// Add pagination
    pub fn paginate(mut self, page: u64, limit: u64) -> Self {
        self.page = page.max(1);
        self.limit = limit.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Add a filter condition
    pub fn filter(mut self, condition: Condition) -> Self {
        self.query = self.query.filter(condition);
        self
    }

    /// Add a filter condition when one was built
    pub fn filter_opt(self, condition: Option<Condition>) -> Self {
        match condition {
            Some(condition) => self.filter(condition),
            None => self,
        }
    }

    /// Add ordering
    pub fn order_by<C>(mut self, column: C, desc: bool) -> Self
    where
        C: ColumnTrait,
    {
        self.query = if desc {
            self.query.order_by_desc(column)
        } else {
            self.query.order_by_asc(column)
        };
        self
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Execute the query and return the requested page plus the filtered total
    pub async fn execute<C>(self, db: &C) -> Result<(Vec<E::Model>, u64), DbErr>
    where
        C: ConnectionTrait,
        E::Model: Send + Sync,
    {
        let total = self.query.clone().count(db).await?;
        let items = self
            .query
            .limit(self.limit)
            .offset((self.page - 1) * self.limit)
            .all(db)
            .await?;

        Ok((items, total))
    }
}

/// Helper for building "any of these columns" search conditions
#[derive(Default)]
pub struct SearchBuilder {
    conditions: Vec<Condition>,
}

impl SearchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a LIKE condition for text search
    pub fn add_like<C: ColumnTrait>(mut self, column: C, pattern: &str) -> Self {
        let pattern = pattern.trim();
        if !pattern.is_empty() {
            self.conditions
                .push(Condition::all().add(column.contains(pattern)));
        }
        self
    }

    /// Build the final condition; any of the added conditions matches
    pub fn build(self) -> Option<Condition> {
        if self.conditions.is_empty() {
            None
        } else {
            Some(
                self.conditions
                    .into_iter()
                    .fold(Condition::any(), |acc, cond| acc.add(cond)),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::product;

    #[test]
    fn paginate_clamps_page_and_limit() {
        let builder = QueryBuilder::<product::Entity>::new().paginate(0, 500);
        assert_eq!(builder.page(), 1);
        assert_eq!(builder.limit(), MAX_PAGE_SIZE);

        let builder = QueryBuilder::<product::Entity>::new().paginate(3, 0);
        assert_eq!(builder.page(), 3);
        assert_eq!(builder.limit(), 1);
    }

    #[test]
    fn empty_search_builds_nothing() {
        assert!(SearchBuilder::new()
            .add_like(product::Column::Name, "   ")
            .build()
            .is_none());
        assert!(SearchBuilder::new()
            .add_like(product::Column::Name, "aspirin")
            .add_like(product::Column::Sku, "aspirin")
            .build()
            .is_some());
    }
}
