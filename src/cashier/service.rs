//! Cashier shift engine: close-out reconciliation against the three-order booking
//! sequence the original service performs.

use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::HashMap;

use crate::account::models::reserved::{ACCOUNT_CASH_VAULT, ACCOUNT_IMBALANCE, TAX_NONE, VIRTUAL_TILL_ID};
use crate::error::CoreError;
use crate::order::{book_order_in_tx, BookingKey, NewBookedOrder, NewLineItem, OrderType};
use crate::product::ProductRepository;
use super::models::CloseOutResult;

pub struct CashierService {
    pool: PgPool,
}

pub struct CloseOutRequest {
    pub cashier_id: i64,
    pub comment: String,
    pub actual_cash_drawer_balance: Decimal,
    pub closing_out_user_id: i64,
}

impl CashierService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn close_out_cashier(&self, req: CloseOutRequest) -> Result<CloseOutResult, CoreError> {
        let cashier = sqlx::query!(
            "select cashier_account_id, cash_register_id from usr where id = $1",
            req.cashier_id
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CoreError::not_found("cashier", req.cashier_id.to_string()))?;

        let cashier_account_id = cashier
            .cashier_account_id
            .ok_or_else(|| CoreError::invalid_argument("user is not a cashier"))?;
        if cashier.cash_register_id.is_none() {
            return Err(CoreError::invalid_argument("cashier has no cash register attached"));
        }

        let still_logged_in = sqlx::query_scalar!(
            "select count(*) from till where active_user_id = $1",
            req.cashier_id
        )
        .fetch_one(&self.pool)
        .await?
        .unwrap_or(0);
        if still_logged_in > 0 {
            return Err(CoreError::Conflict { message: "cashier is still logged in on a till".to_string() });
        }

        let last_shift_end = sqlx::query_scalar!(
            "select max(ended_at) from cashier_shift where cashier_id = $1",
            req.cashier_id
        )
        .fetch_one(&self.pool)
        .await?;
        let has_new_orders = sqlx::query_scalar!(
            "select count(*) from ordr where cashier_id = $1 and status = 'done' and booked_at > coalesce($2, 'epoch')",
            req.cashier_id,
            last_shift_end
        )
        .fetch_one(&self.pool)
        .await?
        .unwrap_or(0);
        if has_new_orders == 0 {
            return Err(CoreError::Conflict { message: "no orders booked since last close-out".to_string() });
        }

        let expected = sqlx::query_scalar!("select balance from account where id = $1", cashier_account_id)
            .fetch_one(&self.pool)
            .await?;
        let imbalance = req.actual_cash_drawer_balance - expected;
        let money_diff_product = ProductRepository::fetch_money_difference_product(&self.pool).await?;

        // All five steps share one transaction: a crash partway through must leave neither
        // the ledger nor the shift bookkeeping changed.
        let mut tx = self.pool.begin().await.map_err(CoreError::from)?;

        // (1) close-out start: a receipt-only transfer with no bookings, carrying the
        // tse-signed "shift closed" moment.
        book_order_in_tx(
            &mut tx,
            NewBookedOrder {
                order_type: OrderType::MoneyTransfer,
                till_id: VIRTUAL_TILL_ID,
                cashier_id: req.cashier_id,
                customer_account_id: None,
                cash_register_id: cashier.cash_register_id,
                line_items: Vec::new(),
                bookings: HashMap::new(),
            },
        )
        .await?;

        // (2) the cash-register leg against the vault, for the actual counted amount.
        let mut vault_bookings = HashMap::new();
        vault_bookings.insert(
            BookingKey { source_account_id: cashier_account_id, target_account_id: ACCOUNT_CASH_VAULT, tax_name: TAX_NONE },
            req.actual_cash_drawer_balance,
        );
        let vault_order = book_order_in_tx(
            &mut tx,
            NewBookedOrder {
                order_type: OrderType::MoneyTransfer,
                till_id: VIRTUAL_TILL_ID,
                cashier_id: req.cashier_id,
                customer_account_id: None,
                cash_register_id: cashier.cash_register_id,
                line_items: Vec::new(),
                bookings: vault_bookings,
            },
        )
        .await?;

        // (3) the imbalance booking against the reserved MONEY_DIFFERENCE product.
        let mut imbalance_bookings = HashMap::new();
        let (source, target) = if imbalance >= Decimal::ZERO {
            (ACCOUNT_IMBALANCE, cashier_account_id)
        } else {
            (cashier_account_id, ACCOUNT_IMBALANCE)
        };
        imbalance_bookings.insert(
            BookingKey { source_account_id: source, target_account_id: target, tax_name: TAX_NONE },
            imbalance.abs(),
        );
        let imbalance_order = book_order_in_tx(
            &mut tx,
            NewBookedOrder {
                order_type: OrderType::MoneyTransferImbalance,
                till_id: VIRTUAL_TILL_ID,
                cashier_id: req.cashier_id,
                customer_account_id: None,
                cash_register_id: cashier.cash_register_id,
                line_items: vec![NewLineItem {
                    quantity: 1,
                    product_id: money_diff_product.id,
                    product_price: imbalance,
                    tax_name: money_diff_product.tax_name.clone(),
                    tax_rate: money_diff_product.tax_rate,
                }],
                bookings: imbalance_bookings,
            },
        )
        .await?;

        let shift_id = sqlx::query_scalar!(
            r#"insert into cashier_shift
                 (cashier_id, started_at, ended_at, expected_balance, actual_balance, comment,
                  close_out_order_id, close_out_imbalance_order_id, closing_out_user_id)
               values ($1, coalesce($2, now()), now(), $3, $4, $5, $6, $7, $8)
               returning id"#,
            req.cashier_id,
            last_shift_end,
            expected,
            req.actual_cash_drawer_balance,
            req.comment,
            vault_order.id,
            imbalance_order.id,
            req.closing_out_user_id
        )
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query!("update usr set cash_register_id = null where id = $1", req.cashier_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query!("update till set z_nr = z_nr + 1 where id = $1", VIRTUAL_TILL_ID)
            .execute(&mut *tx)
            .await?;
        sqlx::query!("update account set balance = 0 where id = $1", cashier_account_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await.map_err(CoreError::from)?;

        Ok(CloseOutResult { shift_id, imbalance })
    }
}
