//! sea-orm models for the pharmacy schema.

pub mod branch;
pub mod cart_item;
pub mod customer;
pub mod feedback;
pub mod inventory;
pub mod order;
pub mod order_item;
pub mod payment;
pub mod prescription;
pub mod product;
pub mod return_request;
pub mod user_account;
pub mod user_session;

pub use order::{OrderStatus, PaymentStatus};
pub use payment::{PaymentMethod, PaymentRecordStatus};
pub use prescription::PrescriptionStatus;
pub use return_request::ReturnStatus;
pub use user_account::UserRole;
