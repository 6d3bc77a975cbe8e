//! Data model for accounts and the reserved well-known ids/products named in the ledger.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Private,
    Cashier,
    CashRegister,
    CashVault,
    CashEntry,
    Sumup,
    Imbalance,
    SepaExit,
    DonationExit,
    VirtualTill,
}

impl AccountKind {
    /// Only `private` accounts are ever subject to the no-overdraft rule.
    pub fn can_go_negative(self) -> bool {
        !matches!(self, AccountKind::Private)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub kind: AccountKind,
    pub name: Option<String>,
    pub balance: Decimal,
    pub user_tag_id: Option<i64>,
    pub restriction: Option<String>,
}

/// Well-known row ids seeded by migration and referenced throughout the core so that no
/// other module hard-codes an integer account/product id.
pub mod reserved {
    pub const ACCOUNT_CASH_VAULT: i64 = 1;
    pub const ACCOUNT_CASH_ENTRY: i64 = 2;
    pub const ACCOUNT_SUMUP: i64 = 3;
    pub const ACCOUNT_IMBALANCE: i64 = 4;
    pub const VIRTUAL_TILL_ID: i64 = 1;

    pub const PRODUCT_DISCOUNT: i64 = 1;
    pub const PRODUCT_TOP_UP: i64 = 2;
    pub const PRODUCT_PAY_OUT: i64 = 3;
    pub const PRODUCT_MONEY_TRANSFER: i64 = 4;
    pub const PRODUCT_MONEY_DIFFERENCE: i64 = 5;

    pub const TAX_NONE: &str = "none";
}
