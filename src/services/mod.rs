//! Business services. Each service owns the SQL for one resource and
//! publishes domain events after its writes commit.

pub mod branches;
pub mod cart;
pub mod customers;
pub mod dashboard;
pub mod export;
pub mod feedback;
pub mod inventory;
pub mod orders;
pub mod payments;
pub mod prescriptions;
pub mod products;
pub mod returns;

use crate::{
    auth::AuthUser,
    db::query_builder::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE},
    errors::ServiceError,
};
use uuid::Uuid;

/// Normalised page/limit pair shared by every list operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Whose records a caller may read. Staff see everything; customers only their own rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Staff,
    Customer(Uuid),
}

impl Viewer {
    pub fn from_auth(user: &AuthUser) -> Result<Self, ServiceError> {
        if user.is_staff() {
            Ok(Viewer::Staff)
        } else {
            user.require_customer().map(Viewer::Customer)
        }
    }

    /// Customer id the caller is restricted to, if any
    pub fn customer_scope(&self) -> Option<Uuid> {
        match self {
            Viewer::Staff => None,
            Viewer::Customer(id) => Some(*id),
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Viewer::Staff)
    }

    /// Other customers' rows are reported as missing rather than forbidden
    pub fn can_see(&self, owner: Uuid) -> bool {
        match self {
            Viewer::Staff => true,
            Viewer::Customer(id) => *id == owner,
        }
    }
}
