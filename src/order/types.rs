use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema)]
#[sqlx(type_name = "order_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Sale,
    TopupCash,
    TopupSumup,
    PayOut,
    MoneyTransfer,
    MoneyTransferImbalance,
    Ticket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Done,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NewLineItem {
    pub quantity: i32,
    pub product_id: i64,
    /// Price actually charged for this item; for a free-price product this is the
    /// caller-supplied price, for a fixed-price product it must equal the product's price.
    pub product_price: Decimal,
    pub tax_name: String,
    pub tax_rate: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LineItem {
    pub order_id: i64,
    pub item_id: i32,
    pub product_id: i64,
    pub quantity: i32,
    pub price: Decimal,
    pub tax_name: String,
    pub tax_rate: Decimal,
}

impl LineItem {
    pub fn total_price(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }

    /// `total_price - total_price / (1 + tax_rate)`.
    pub fn total_tax(&self) -> Decimal {
        let total = self.total_price();
        total - total / (Decimal::ONE + self.tax_rate)
    }
}

/// Key an aggregated booking is grouped by: one ledger transaction is written per distinct
/// `(source, target, tax)` triple, not per line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BookingKey {
    pub source_account_id: i64,
    pub target_account_id: i64,
    pub tax_name: &'static str,
}

pub type BookingMap = HashMap<BookingKey, Decimal>;

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Order {
    pub id: i64,
    pub uuid: Uuid,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub cashier_id: i64,
    pub till_id: i64,
    pub customer_account_id: Option<i64>,
    pub cash_register_id: Option<i64>,
    pub booked_at: Option<DateTime<Utc>>,
    pub item_count: i32,
    pub value_sum: Decimal,
    pub value_tax: Decimal,
    pub value_notax: Decimal,
}

/// Preview returned by `create_order`, before confirmation.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct CompletedOrder {
    pub id: i64,
    pub uuid: Uuid,
    pub old_balance: Decimal,
    pub new_balance: Decimal,
}

/// Result of booking (confirming) an order.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct OrderInfo {
    pub id: i64,
    pub uuid: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub order_type: OrderType,
    pub customer_tag_uid: Option<i64>,
    pub line_items: Vec<NewLineItemRequest>,
    /// Only meaningful for `OrderType::Ticket`: an additional amount to top up onto the
    /// customer's account in the same order, synthesized as a `topup_cash`-shaped booking
    /// pair alongside the ticket's own sale bookings.
    #[serde(default)]
    pub initial_top_up: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLineItemRequest {
    pub product_id: i64,
    pub quantity: i32,
    /// Only set for free-price products.
    pub price: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn line_item_totals() {
        let li = LineItem {
            order_id: 1,
            item_id: 0,
            product_id: 1,
            quantity: 2,
            price: Decimal::from_str("4.20").unwrap(),
            tax_name: "ust".into(),
            tax_rate: Decimal::from_str("0.19").unwrap(),
        };
        assert_eq!(li.total_price(), Decimal::from_str("8.40").unwrap());
        // 8.40 - 8.40/1.19 = 8.40 - 7.058823... ~= 1.341176...
        let tax = li.total_tax();
        assert!(tax > Decimal::from_str("1.34").unwrap() && tax < Decimal::from_str("1.35").unwrap());
    }
}
