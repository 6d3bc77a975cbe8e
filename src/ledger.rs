//! The double-entry booking primitive. Every balance change in the system passes through
//! `book_transaction`; no other module writes to `account.balance`.

use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use thiserror::Error;

use crate::account::models::AccountKind;
use crate::error::CoreError;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("account {0} not found")]
    AccountNotFound(i64),
    #[error("tax rate '{0}' not found")]
    TaxRateNotFound(String),
    #[error("insufficient funds: needed {needed}, available {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<LedgerError> for CoreError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AccountNotFound(id) => CoreError::not_found("account", id.to_string()),
            LedgerError::TaxRateNotFound(name) => CoreError::not_found("tax_rate", name),
            LedgerError::InsufficientFunds { needed, available } => {
                CoreError::InsufficientFunds { needed, available }
            }
            LedgerError::Database(e) => e.into(),
        }
    }
}

struct AccountForUpdate {
    kind: AccountKind,
    balance: Decimal,
}

/// Atomically subtracts `amount` from `source`, adds it to `target`, and records one
/// transaction row. Locks both account rows with `SELECT ... FOR UPDATE` before mutating
/// them, in ascending id order, to avoid deadlocking against a concurrent booking that
/// touches the same two accounts in the opposite direction.
pub async fn book_transaction(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Option<i64>,
    source_account_id: i64,
    target_account_id: i64,
    amount: Decimal,
    tax_name: &str,
    description: &str,
) -> Result<i64, LedgerError> {
    let (first, second) = if source_account_id <= target_account_id {
        (source_account_id, target_account_id)
    } else {
        (target_account_id, source_account_id)
    };

    sqlx::query_scalar!(
        r#"select 1 as "one!" from account where id = $1 for update"#,
        first
    )
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(LedgerError::AccountNotFound(first))?;
    if second != first {
        sqlx::query_scalar!(
            r#"select 1 as "one!" from account where id = $1 for update"#,
            second
        )
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(LedgerError::AccountNotFound(second))?;
    }

    sqlx::query_scalar!("select 1 as \"one!\" from tax_rate where name = $1", tax_name)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| LedgerError::TaxRateNotFound(tax_name.to_string()))?;

    let source = fetch_for_update(tx, source_account_id).await?;
    let target = fetch_for_update(tx, target_account_id).await?;
    let _ = target;

    let new_source_balance = source.balance - amount;
    if !source.kind.can_go_negative() && new_source_balance < Decimal::ZERO {
        return Err(LedgerError::InsufficientFunds {
            needed: amount,
            available: source.balance,
        });
    }

    sqlx::query!(
        "update account set balance = balance - $1 where id = $2",
        amount,
        source_account_id
    )
    .execute(&mut **tx)
    .await?;
    sqlx::query!(
        "update account set balance = balance + $1 where id = $2",
        amount,
        target_account_id
    )
    .execute(&mut **tx)
    .await?;

    let transaction_id = sqlx::query_scalar!(
        "insert into transaction (order_id, source_account, target_account, amount, tax_name, booked_at, description)
         values ($1, $2, $3, $4, $5, now(), $6) returning id",
        order_id,
        source_account_id,
        target_account_id,
        amount,
        tax_name,
        description
    )
    .fetch_one(&mut **tx)
    .await?;

    Ok(transaction_id)
}

async fn fetch_for_update(
    tx: &mut Transaction<'_, Postgres>,
    account_id: i64,
) -> Result<AccountForUpdate, LedgerError> {
    sqlx::query_as!(
        AccountForUpdateRow,
        r#"select kind as "kind: AccountKind", balance from account where id = $1"#,
        account_id
    )
    .fetch_optional(&mut **tx)
    .await?
    .map(|r| AccountForUpdate { kind: r.kind, balance: r.balance })
    .ok_or(LedgerError::AccountNotFound(account_id))
}

struct AccountForUpdateRow {
    kind: AccountKind,
    balance: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_accounts_cannot_go_negative() {
        assert!(!AccountKind::Private.can_go_negative());
        assert!(AccountKind::CashVault.can_go_negative());
    }
}
