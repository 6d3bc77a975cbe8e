mod models;
mod service;

pub use models::{Till, TillProfile, TerminalConfig};
pub use service::TillService;
