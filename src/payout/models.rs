use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PayoutRun {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub created_by: i64,
    pub execution_date: NaiveDate,
    pub set_done_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Payout {
    pub customer_account_id: i64,
    pub iban: String,
    pub account_name: String,
    pub email: Option<String>,
    pub user_tag_uid: i64,
    pub balance: Decimal,
}

/// The SEPA sender identity, loaded from `CoreConfig`.
#[derive(Debug, Clone)]
pub struct SepaConfig {
    pub sender_iban: String,
    pub sender_name: String,
    pub description_template: String,
    pub currency: String,
}
