use sqlx::PgPool;

use crate::account::models::reserved::PRODUCT_MONEY_DIFFERENCE;
use crate::error::CoreError;
use super::models::Product;

pub struct ProductRepository;

impl ProductRepository {
    pub async fn fetch(pool: &PgPool, product_id: i64) -> Result<Option<Product>, CoreError> {
        let row = sqlx::query!(
            r#"select p.id, p.name, p.price, p.fixed_price, p.price_in_vouchers,
                      t.name as tax_name, t.rate as tax_rate, p.restrictions,
                      p.is_locked, p.is_returnable, p.target_account_id
               from product p join tax_rate t on p.tax_name = t.name
               where p.id = $1"#,
            product_id
        )
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|r| Product {
            id: r.id,
            name: r.name,
            price: r.price,
            fixed_price: r.fixed_price,
            price_in_vouchers: r.price_in_vouchers,
            tax_name: r.tax_name,
            tax_rate: r.tax_rate,
            restrictions: r.restrictions.unwrap_or_default(),
            is_locked: r.is_locked,
            is_returnable: r.is_returnable,
            target_account_id: r.target_account_id,
        }))
    }

    /// The reserved `MONEY_DIFFERENCE` product booked by cashier close-out. Never offered
    /// to clients directly.
    pub async fn fetch_money_difference_product(pool: &PgPool) -> Result<Product, CoreError> {
        Self::fetch(pool, PRODUCT_MONEY_DIFFERENCE)
            .await?
            .ok_or_else(|| CoreError::internal("reserved MONEY_DIFFERENCE product row missing"))
    }
}
