use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Closed set of privileges a role may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema)]
#[sqlx(type_name = "privilege", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Privilege {
    Cashier,
    CashierManagement,
    TillManagement,
    UserManagement,
    ProductManagement,
    TaxRateManagement,
    NodeAdministration,
    TerminalLogin,
    SupervisedTerminalLogin,
    ConfigManagement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub is_privileged: bool,
    pub privileges: Vec<Privilege>,
}

impl Role {
    pub fn has(&self, privilege: Privilege) -> bool {
        self.privileges.contains(&privilege)
    }

    pub fn can_log_in_unsupervised(&self) -> bool {
        self.has(Privilege::TerminalLogin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub display_name: String,
    pub user_tag_id: Option<i64>,
    pub cashier_account_id: Option<i64>,
    pub transport_account_id: Option<i64>,
}

/// The materialized identity a terminal session operates as once a user is logged in.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct CurrentUser {
    pub user: User,
    pub role: Role,
}

impl CurrentUser {
    pub fn requires(&self, privilege: Privilege) -> bool {
        self.role.has(privilege)
    }
}

/// A cashier's materialized balances, returned by `get_user_info`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct UserInfo {
    pub user: User,
    pub cashier_account_balance: Decimal,
    pub transport_account_balance: Option<Decimal>,
    pub cash_register_id: Option<i64>,
}
