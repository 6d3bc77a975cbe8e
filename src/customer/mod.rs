mod iban;
mod models;
mod service;

pub use iban::Iban;
pub use models::{ApiConfig, CustomerBank, CustomerInfo, PayoutInfo};
pub use service::CustomerService;
