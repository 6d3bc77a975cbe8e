use sqlx::PgPool;
use std::sync::Arc;

use crate::cashier::CashierService;
use crate::customer::CustomerService;
use crate::order::OrderService;
use crate::payout::{PayoutService, SepaConfig};
use crate::till::TillService;

/// Shared application state: one service struct per domain area, each holding its own
/// clone of the pool. Cloning `AppState` is cheap (`Arc` + `PgPool` are both handle types).
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub order: Arc<OrderService>,
    pub till: Arc<TillService>,
    pub cashier: Arc<CashierService>,
    pub customer: Arc<CustomerService>,
    pub payout: Arc<PayoutService>,
}

impl AppState {
    pub fn new(pool: PgPool, sepa_config: SepaConfig) -> Self {
        Self {
            order: Arc::new(OrderService::new(pool.clone())),
            till: Arc::new(TillService::new(pool.clone())),
            cashier: Arc::new(CashierService::new(pool.clone())),
            customer: Arc::new(CustomerService::new(pool.clone())),
            payout: Arc::new(PayoutService::new(pool.clone(), sepa_config)),
            pool,
        }
    }
}
