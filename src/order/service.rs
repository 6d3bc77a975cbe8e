//! Order Service: the public façade for client-visible orders (create / confirm / cancel),
//! synthesizing the canonical bookings map per order type.

use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::account::models::reserved::{
    ACCOUNT_CASH_ENTRY, ACCOUNT_CASH_VAULT, ACCOUNT_SUMUP, PRODUCT_TOP_UP, TAX_NONE,
};
use crate::account::models::AccountKind;
use crate::error::CoreError;
use crate::product::ProductRepository;
use super::booker::{apply_bookings, finish_order, insert_line_items, insert_pending_order, recompute_order_totals};
use super::types::{
    BookingKey, BookingMap, CompletedOrder, LineItem, NewLineItem, NewOrder, Order, OrderStatus, OrderType,
};

pub struct OrderService {
    pool: PgPool,
}

impl OrderService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Writes a `pending` order, validates every precondition, and returns a preview of the
    /// balance change without booking anything. The returned `uuid` is the idempotency key:
    /// a second `create_order` call carrying the same client-supplied uuid must be routed by
    /// the caller to `find_by_uuid` instead of calling this again.
    pub async fn create_order(
        &self,
        till_id: i64,
        cashier_id: i64,
        new_order: NewOrder,
    ) -> Result<CompletedOrder, CoreError> {
        let mut tx = self.pool.begin().await.map_err(CoreError::from)?;

        let customer_account_id = match new_order.customer_tag_uid {
            Some(uid) => {
                let row = sqlx::query!(
                    r#"select a.id, a.balance, a.restriction
                       from user_tag t join account a on t.id = a.user_tag_id where t.uid = $1"#,
                    uid
                )
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| CoreError::invalid_argument("unknown customer tag"))?;
                Some((row.id, row.balance, row.restriction))
            }
            None => None,
        };

        let (order_id, uuid) = insert_pending_order(
            &mut tx,
            new_order.order_type,
            till_id,
            cashier_id,
            customer_account_id.as_ref().map(|(id, ..)| *id),
            None,
        )
        .await?;

        let mut line_items = Vec::new();
        let mut restricted_products: Vec<i64> = Vec::new();
        let customer_restriction = customer_account_id.as_ref().and_then(|(_, _, r)| r.clone());

        for item in &new_order.line_items {
            let product = ProductRepository::fetch(&self.pool, item.product_id)
                .await?
                .ok_or_else(|| CoreError::not_found("product", item.product_id.to_string()))?;

            if product.fixed_price && item.price.is_some() {
                return Err(CoreError::invalid_argument(
                    "fixed-price product may not carry an explicit item price",
                ));
            }
            let (price, quantity) = if product.fixed_price {
                (product.price.unwrap(), item.quantity)
            } else {
                let price = item
                    .price
                    .ok_or_else(|| CoreError::invalid_argument("free-price product requires an item price"))?;
                (price, 1)
            };

            let restricted = !product.restrictions.is_empty()
                && match &customer_restriction {
                    Some(r) => !product.restrictions.contains(r),
                    None => true,
                };
            if restricted {
                restricted_products.push(product.id);
            }

            line_items.push(LineItem {
                order_id,
                item_id: line_items.len() as i32,
                product_id: product.id,
                quantity,
                price,
                tax_name: product.tax_name.clone(),
                tax_rate: product.tax_rate,
            });
        }

        // The requested products' total, computed before any synthetic top-up line item is
        // appended, so the top-up amount never pollutes the funds/age-restriction checks above.
        let sale_value_sum: Decimal = line_items.iter().map(|li| li.price * Decimal::from(li.quantity)).sum();

        let top_up_amount = match new_order.order_type {
            OrderType::Ticket => new_order.initial_top_up.filter(|amount| *amount > Decimal::ZERO),
            _ => None,
        };
        if let Some(amount) = top_up_amount {
            let top_up_product = ProductRepository::fetch(&self.pool, PRODUCT_TOP_UP)
                .await?
                .ok_or_else(|| CoreError::internal("reserved TOP_UP product row missing"))?;
            line_items.push(LineItem {
                order_id,
                item_id: line_items.len() as i32,
                product_id: top_up_product.id,
                quantity: 1,
                price: amount,
                tax_name: top_up_product.tax_name.clone(),
                tax_rate: top_up_product.tax_rate,
            });
        }

        insert_line_items(
            &mut tx,
            order_id,
            &line_items
                .iter()
                .map(|li| NewLineItem {
                    quantity: li.quantity,
                    product_id: li.product_id,
                    product_price: li.price,
                    tax_name: li.tax_name.clone(),
                    tax_rate: li.tax_rate,
                })
                .collect::<Vec<_>>(),
        )
        .await?;
        recompute_order_totals(&mut tx, order_id).await?;

        if !restricted_products.is_empty() {
            return Err(CoreError::AgeRestriction { product_ids: restricted_products });
        }

        let old_balance = customer_account_id.as_ref().map(|(_, b, _)| *b).unwrap_or_default();
        let new_balance = match new_order.order_type {
            OrderType::Sale | OrderType::Ticket => {
                if old_balance < sale_value_sum {
                    return Err(CoreError::InsufficientFunds { needed: sale_value_sum, available: old_balance });
                }
                old_balance - sale_value_sum + top_up_amount.unwrap_or_default()
            }
            OrderType::TopupCash | OrderType::TopupSumup => {
                if line_items.len() != 1 || line_items[0].price < Decimal::ZERO {
                    return Err(CoreError::invalid_argument(
                        "top-up requires exactly one line item with a non-negative price",
                    ));
                }
                old_balance + sale_value_sum
            }
            OrderType::PayOut => {
                if line_items.len() != 1 || line_items[0].price > Decimal::ZERO {
                    return Err(CoreError::invalid_argument("pay-out requires one non-positive line item"));
                }
                old_balance + sale_value_sum
            }
            OrderType::MoneyTransfer | OrderType::MoneyTransferImbalance => {
                return Err(CoreError::invalid_argument(
                    "this order type cannot be created directly by a client",
                ));
            }
        };

        tx.commit().await.map_err(CoreError::from)?;
        Ok(CompletedOrder { id: order_id, uuid, old_balance, new_balance })
    }

    /// Returns an already-pending order with the given client-supplied uuid, if one exists.
    /// Callers use this to implement the idempotent retry behavior around `create_order`.
    pub async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<Order>, CoreError> {
        let row = sqlx::query!(
            r#"select id, uuid, order_type as "order_type: OrderType", status as "status: OrderStatus",
                      cashier_id, till_id, customer_account_id, cash_register_id, booked_at,
                      itemcount, value_sum, value_tax, value_notax
               from ordr where uuid = $1"#,
            uuid
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| Order {
            id: r.id,
            uuid: r.uuid,
            order_type: r.order_type,
            status: r.status,
            cashier_id: r.cashier_id,
            till_id: r.till_id,
            customer_account_id: r.customer_account_id,
            cash_register_id: r.cash_register_id,
            booked_at: r.booked_at,
            item_count: r.itemcount.unwrap_or_default(),
            value_sum: r.value_sum.unwrap_or_default(),
            value_tax: r.value_tax.unwrap_or_default(),
            value_notax: r.value_notax.unwrap_or_default(),
        }))
    }

    /// Confirms a pending order: synthesizes its bookings and invokes the ledger once per
    /// aggregated key. Returns the customer's new balance.
    pub async fn book_order(&self, order_id: i64) -> Result<Decimal, CoreError> {
        let mut tx = self.pool.begin().await.map_err(CoreError::from)?;

        let order = sqlx::query!(
            r#"select order_type as "order_type: OrderType", status as "status: OrderStatus",
                      customer_account_id, cashier_id
               from ordr where id = $1"#,
            order_id
        )
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::not_found("order", order_id.to_string()))?;

        if order.status != OrderStatus::Pending {
            return Err(CoreError::AlreadyFinished { order_id });
        }

        let line_items = sqlx::query!(
            "select product_id, quantity, price, tax_name, tax_rate from line_item where order_id = $1 order by item_id",
            order_id
        )
        .fetch_all(&mut *tx)
        .await?;

        let bookings: BookingMap = match order.order_type {
            OrderType::Sale | OrderType::Ticket => {
                let customer_id = order
                    .customer_account_id
                    .ok_or_else(|| CoreError::internal("sale order missing customer account"))?;
                let mut map = HashMap::new();
                for li in &line_items {
                    if li.product_id == PRODUCT_TOP_UP {
                        // A ticket's `initial_top_up` line item: same booking pair as
                        // topup_cash, synthesized alongside the ticket's own sale bookings.
                        let cashier_account_id = cashier_account_id(&mut tx, order.cashier_id).await?;
                        let amount = li.price * Decimal::from(li.quantity);
                        *map.entry(BookingKey {
                            source_account_id: ACCOUNT_CASH_VAULT,
                            target_account_id: customer_id,
                            tax_name: leak_tax_name(&li.tax_name),
                        })
                        .or_insert(Decimal::ZERO) += amount;
                        *map.entry(BookingKey {
                            source_account_id: ACCOUNT_CASH_ENTRY,
                            target_account_id: cashier_account_id,
                            tax_name: TAX_NONE,
                        })
                        .or_insert(Decimal::ZERO) += amount;
                        continue;
                    }
                    let product = ProductRepository::fetch(&self.pool, li.product_id)
                        .await?
                        .ok_or_else(|| CoreError::not_found("product", li.product_id.to_string()))?;
                    let target = product
                        .target_account_id
                        .ok_or_else(|| CoreError::internal("product has no target account configured"))?;
                    let key = BookingKey {
                        source_account_id: customer_id,
                        target_account_id: target,
                        tax_name: leak_tax_name(&li.tax_name),
                    };
                    *map.entry(key).or_insert(Decimal::ZERO) += li.price * Decimal::from(li.quantity);
                }
                map
            }
            OrderType::TopupCash => {
                let customer_id = order
                    .customer_account_id
                    .ok_or_else(|| CoreError::internal("top-up order missing customer account"))?;
                let cashier_account_id = cashier_account_id(&mut tx, order.cashier_id).await?;
                let li = line_items
                    .first()
                    .ok_or_else(|| CoreError::internal("top-up order has no line item"))?;
                let amount = li.price * Decimal::from(li.quantity);
                let mut map = HashMap::new();
                map.insert(
                    BookingKey {
                        source_account_id: ACCOUNT_CASH_VAULT,
                        target_account_id: customer_id,
                        tax_name: leak_tax_name(&li.tax_name),
                    },
                    amount,
                );
                map.insert(
                    BookingKey { source_account_id: ACCOUNT_CASH_ENTRY, target_account_id: cashier_account_id, tax_name: TAX_NONE },
                    amount,
                );
                map
            }
            OrderType::TopupSumup => {
                let customer_id = order
                    .customer_account_id
                    .ok_or_else(|| CoreError::internal("top-up order missing customer account"))?;
                let li = line_items
                    .first()
                    .ok_or_else(|| CoreError::internal("top-up order has no line item"))?;
                let amount = li.price * Decimal::from(li.quantity);
                let mut map = HashMap::new();
                map.insert(
                    BookingKey { source_account_id: ACCOUNT_SUMUP, target_account_id: customer_id, tax_name: leak_tax_name(&li.tax_name) },
                    amount,
                );
                map
            }
            OrderType::PayOut => {
                let customer_id = order
                    .customer_account_id
                    .ok_or_else(|| CoreError::internal("pay-out order missing customer account"))?;
                let cashier_account_id = cashier_account_id(&mut tx, order.cashier_id).await?;
                let li = line_items
                    .first()
                    .ok_or_else(|| CoreError::internal("pay-out order has no line item"))?;
                let amount = (li.price * Decimal::from(li.quantity)).abs();
                let mut map = HashMap::new();
                map.insert(
                    BookingKey { source_account_id: customer_id, target_account_id: ACCOUNT_CASH_VAULT, tax_name: leak_tax_name(&li.tax_name) },
                    amount,
                );
                map.insert(
                    BookingKey { source_account_id: cashier_account_id, target_account_id: ACCOUNT_CASH_ENTRY, tax_name: TAX_NONE },
                    amount,
                );
                map
            }
            OrderType::MoneyTransfer | OrderType::MoneyTransferImbalance => {
                return Err(CoreError::internal("transfer orders must be booked through the booker directly"));
            }
        };

        apply_bookings(&mut tx, order_id, &bookings).await?;
        recompute_order_totals(&mut tx, order_id).await?;
        finish_order(&mut tx, order_id).await?;

        let new_balance = if let Some(customer_id) = order.customer_account_id {
            sqlx::query_scalar!("select balance from account where id = $1", customer_id)
                .fetch_one(&mut *tx)
                .await?
        } else {
            Decimal::ZERO
        };

        tx.commit().await.map_err(CoreError::from)?;
        Ok(new_balance)
    }

    /// Transitions a pending order to `cancelled`. Both terminal states stamp `booked_at`,
    /// matching the booking service's own behavior.
    pub async fn cancel_order(&self, order_id: i64) -> Result<(), CoreError> {
        let status = sqlx::query_scalar!(
            r#"select status as "status: OrderStatus" from ordr where id = $1"#,
            order_id
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CoreError::not_found("order", order_id.to_string()))?;

        if status != OrderStatus::Pending {
            return Err(CoreError::AlreadyFinished { order_id });
        }

        sqlx::query!(
            "update ordr set booked_at = now(), status = 'cancelled' where id = $1",
            order_id
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn show_order(&self, order_id: i64) -> Result<Option<Order>, CoreError> {
        let row = sqlx::query!(
            r#"select id, uuid, order_type as "order_type: OrderType", status as "status: OrderStatus",
                      cashier_id, till_id, customer_account_id, cash_register_id, booked_at,
                      itemcount, value_sum, value_tax, value_notax
               from ordr where id = $1"#,
            order_id
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| Order {
            id: r.id,
            uuid: r.uuid,
            order_type: r.order_type,
            status: r.status,
            cashier_id: r.cashier_id,
            till_id: r.till_id,
            customer_account_id: r.customer_account_id,
            cash_register_id: r.cash_register_id,
            booked_at: r.booked_at,
            item_count: r.itemcount.unwrap_or_default(),
            value_sum: r.value_sum.unwrap_or_default(),
            value_tax: r.value_tax.unwrap_or_default(),
            value_notax: r.value_notax.unwrap_or_default(),
        }))
    }
}

async fn cashier_account_id(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    cashier_id: i64,
) -> Result<i64, CoreError> {
    sqlx::query_scalar!("select cashier_account_id from usr where id = $1", cashier_id)
        .fetch_optional(&mut **tx)
        .await?
        .flatten()
        .ok_or_else(|| CoreError::internal("cashier has no operating account"))
}

/// Tax names are a small closed set of DB rows; `BookingKey` borrows `'static str` so the
/// aggregation map can be keyed by value instead of by owned `String`. Known tax names are
/// leaked once per process lifetime, which is acceptable given their bounded cardinality.
fn leak_tax_name(name: &str) -> &'static str {
    match name {
        "none" => "none",
        "ust" => "ust",
        "eust" => "eust",
        other => Box::leak(other.to_string().into_boxed_str()),
    }
}
