//! The Order Booker: groups line items + a bookings map into one order and writes it
//! through the ledger primitive. Used directly by system-generated orders (cashier
//! close-out's money transfers) and as the shared confirm-step machinery behind the
//! two-phase Order Service lifecycle (`order::service`).

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::CoreError;
use crate::ledger::book_transaction;
use super::types::{BookingMap, NewLineItem, OrderInfo, OrderType};

pub struct NewBookedOrder {
    pub order_type: OrderType,
    pub till_id: i64,
    pub cashier_id: i64,
    pub customer_account_id: Option<i64>,
    pub cash_register_id: Option<i64>,
    pub line_items: Vec<NewLineItem>,
    pub bookings: BookingMap,
}

/// One-shot create-and-confirm path for orders the system books directly rather than
/// through the client-visible create/confirm/cancel lifecycle (money transfers, the
/// imbalance order from cashier close-out). Opens and commits its own transaction; callers
/// that need several system-generated orders to succeed or fail together (cashier close-out)
/// must use [`book_order_in_tx`] instead, threading one transaction through all of them.
pub async fn book_order(pool: &PgPool, new_order: NewBookedOrder) -> Result<OrderInfo, CoreError> {
    let mut tx = pool.begin().await.map_err(CoreError::from)?;
    let info = book_order_in_tx(&mut tx, new_order).await?;
    tx.commit().await.map_err(CoreError::from)?;
    Ok(info)
}

/// Same synthesis as [`book_order`], against a transaction the caller already holds open.
pub async fn book_order_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    new_order: NewBookedOrder,
) -> Result<OrderInfo, CoreError> {
    let (order_id, uuid) = insert_pending_order(
        tx,
        new_order.order_type,
        new_order.till_id,
        new_order.cashier_id,
        new_order.customer_account_id,
        new_order.cash_register_id,
    )
    .await?;

    insert_line_items(tx, order_id, &new_order.line_items).await?;
    apply_bookings(tx, order_id, &new_order.bookings).await?;
    recompute_order_totals(tx, order_id).await?;
    finish_order(tx, order_id).await?;

    Ok(OrderInfo { id: order_id, uuid })
}

pub(super) async fn insert_pending_order(
    tx: &mut Transaction<'_, Postgres>,
    order_type: OrderType,
    till_id: i64,
    cashier_id: i64,
    customer_account_id: Option<i64>,
    cash_register_id: Option<i64>,
) -> Result<(i64, Uuid), CoreError> {
    let row = sqlx::query!(
        r#"insert into ordr (status, order_type, cashier_id, till_id, customer_account_id, cash_register_id)
           values ('pending', $1, $2, $3, $4, $5)
           returning id, uuid"#,
        order_type as OrderType,
        cashier_id,
        till_id,
        customer_account_id,
        cash_register_id
    )
    .fetch_one(&mut **tx)
    .await?;
    Ok((row.id, row.uuid))
}

pub(super) async fn insert_line_items(
    tx: &mut Transaction<'_, Postgres>,
    order_id: i64,
    line_items: &[NewLineItem],
) -> Result<(), CoreError> {
    for (item_id, item) in line_items.iter().enumerate() {
        sqlx::query!(
            "insert into line_item (order_id, item_id, product_id, quantity, price, tax_name, tax_rate)
             values ($1, $2, $3, $4, $5, $6, $7)",
            order_id,
            item_id as i32,
            item.product_id,
            item.quantity,
            item.product_price,
            item.tax_name,
            item.tax_rate
        )
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Invokes the ledger primitive once per aggregated `(source, target, tax)` key.
pub(super) async fn apply_bookings(
    tx: &mut Transaction<'_, Postgres>,
    order_id: i64,
    bookings: &BookingMap,
) -> Result<(), CoreError> {
    for (key, amount) in bookings {
        book_transaction(
            tx,
            Some(order_id),
            key.source_account_id,
            key.target_account_id,
            *amount,
            key.tax_name,
            "",
        )
        .await
        .map_err(CoreError::from)?;
    }
    Ok(())
}

pub(super) async fn recompute_order_totals(
    tx: &mut Transaction<'_, Postgres>,
    order_id: i64,
) -> Result<(), CoreError> {
    sqlx::query!(
        r#"update ordr set
             itemcount = coalesce((select count(*) from line_item where order_id = $1), 0),
             value_sum = coalesce((select sum(price * quantity) from line_item where order_id = $1), 0),
             value_tax = coalesce((select sum(price * quantity - (price * quantity) / (1 + tax_rate)) from line_item where order_id = $1), 0),
             value_notax = coalesce((select sum((price * quantity) / (1 + tax_rate)) from line_item where order_id = $1), 0)
           where id = $1"#,
        order_id
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub(super) async fn finish_order(tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<(), CoreError> {
    sqlx::query!(
        "update ordr set booked_at = now(), status = 'done' where id = $1",
        order_id
    )
    .execute(&mut **tx)
    .await?;
    sqlx::query!("insert into bon (id) values ($1)", order_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query!("select pg_notify('bon', $1::text)", order_id.to_string())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub(super) fn sum_bookings(bookings: &BookingMap) -> Decimal {
    bookings.values().copied().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn aggregated_bookings_of_a_single_amount_sum_to_itself() {
        let mut bookings: BookingMap = HashMap::new();
        bookings.insert(
            super::super::types::BookingKey {
                source_account_id: 1,
                target_account_id: 2,
                tax_name: "none",
            },
            Decimal::new(1000, 2),
        );
        assert_eq!(sum_bookings(&bookings), Decimal::new(1000, 2));
    }
}
