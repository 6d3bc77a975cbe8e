mod models;
mod service;

pub use models::{CashierShift, CloseOutResult};
pub use service::{CashierService, CloseOutRequest};
