pub mod auth;
pub mod branches;
pub mod cart;
pub mod common;
pub mod customers;
pub mod dashboard;
pub mod feedback;
pub mod inventory;
pub mod orders;
pub mod prescriptions;
pub mod products;
pub mod returns;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::events::EventSender;
use crate::services::{
    branches::BranchService, cart::CartService, customers::CustomerService,
    dashboard::DashboardService, feedback::FeedbackService, inventory::InventoryService,
    orders::OrderService, payments::PaymentService, prescriptions::PrescriptionService,
    products::ProductService, returns::ReturnService,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub auth: Arc<AuthService>,
    pub branches: Arc<BranchService>,
    pub products: Arc<ProductService>,
    pub inventory: Arc<InventoryService>,
    pub customers: Arc<CustomerService>,
    pub cart: Arc<CartService>,
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
    pub prescriptions: Arc<PrescriptionService>,
    pub feedback: Arc<FeedbackService>,
    pub returns: Arc<ReturnService>,
    pub dashboard: Arc<DashboardService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
    ) -> Self {
        let auth = Arc::new(AuthService::new(
            db.clone(),
            event_sender.clone(),
            config.session_ttl_secs,
            config.cookie_secure,
        ));
        let inventory = InventoryService::new(db.clone(), event_sender.clone());
        let orders = OrderService::new(db.clone(), event_sender.clone());
        let payments = PaymentService::new(db.clone(), event_sender.clone());
        let prescriptions = PrescriptionService::new(
            db.clone(),
            event_sender.clone(),
            config.max_prescription_bytes,
        );
        let returns = ReturnService::new(db.clone(), event_sender.clone(), config.return_window_days);
        let dashboard = DashboardService::new(
            prescriptions.clone(),
            inventory.clone(),
            returns.clone(),
            orders.clone(),
            payments.clone(),
        );

        Self {
            auth,
            branches: Arc::new(BranchService::new(db.clone())),
            products: Arc::new(ProductService::new(db.clone(), event_sender.clone())),
            inventory: Arc::new(inventory),
            customers: Arc::new(CustomerService::new(db.clone())),
            cart: Arc::new(CartService::new(db.clone())),
            orders: Arc::new(orders),
            payments: Arc::new(payments),
            prescriptions: Arc::new(prescriptions),
            feedback: Arc::new(FeedbackService::new(db, event_sender)),
            returns: Arc::new(returns),
            dashboard: Arc::new(dashboard),
        }
    }
}
