//! Repository layer for account reads. Balance *writes* only ever happen through
//! `ledger::book_transaction`; nothing here mutates `balance`.

use sqlx::PgPool;

use crate::error::CoreError;
use super::models::Account;

pub struct AccountRepository;

impl AccountRepository {
    pub async fn get_by_id(pool: &PgPool, account_id: i64) -> Result<Account, CoreError> {
        sqlx::query_as!(
            AccountRow,
            r#"select id, kind as "kind: _", name, balance, user_tag_id, restriction
               from account where id = $1"#,
            account_id
        )
        .fetch_optional(pool)
        .await?
        .map(Account::from)
        .ok_or_else(|| CoreError::not_found("account", account_id.to_string()))
    }

    pub async fn get_by_user_tag_uid(pool: &PgPool, uid: i64) -> Result<Option<Account>, CoreError> {
        let row = sqlx::query_as!(
            AccountRow,
            r#"select a.id, a.kind as "kind: _", a.name, a.balance, a.user_tag_id, a.restriction
               from user_tag t join account a on t.id = a.user_tag_id where t.uid = $1"#,
            uid
        )
        .fetch_optional(pool)
        .await?;
        Ok(row.map(Account::from))
    }
}

struct AccountRow {
    id: i64,
    kind: super::models::AccountKind,
    name: Option<String>,
    balance: rust_decimal::Decimal,
    user_tag_id: Option<i64>,
    restriction: Option<String>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            kind: row.kind,
            name: row.name,
            balance: row.balance,
            user_tag_id: row.user_tag_id,
            restriction: row.restriction,
        }
    }
}
