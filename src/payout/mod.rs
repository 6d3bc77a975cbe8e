mod models;
mod sepa;
mod service;

pub use models::{Payout, PayoutRun, SepaConfig};
pub use sepa::render as render_sepa_xml;
pub use service::{ExportOptions, PayoutService};
