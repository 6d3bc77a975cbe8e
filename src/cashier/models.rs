use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct CashierShift {
    pub id: i64,
    pub cashier_id: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub expected_balance: Decimal,
    pub actual_balance: Decimal,
    pub comment: String,
    pub close_out_order_id: i64,
    pub close_out_imbalance_order_id: i64,
    pub closing_out_user_id: i64,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct CloseOutResult {
    pub shift_id: i64,
    pub imbalance: Decimal,
}
