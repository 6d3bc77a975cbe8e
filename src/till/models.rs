use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Till {
    pub id: i64,
    pub name: String,
    pub active_profile_id: i64,
    pub active_user_id: Option<i64>,
    pub active_user_role_id: Option<i64>,
    pub active_cash_register_id: Option<i64>,
    pub registration_uuid: Option<Uuid>,
    pub session_uuid: Option<Uuid>,
}

impl Till {
    pub fn is_registered(&self) -> bool {
        self.session_uuid.is_some()
    }

    pub fn has_user_logged_in(&self) -> bool {
        self.active_user_id.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TillProfile {
    pub id: i64,
    pub name: String,
    pub allow_top_up: bool,
    pub allow_cash_out: bool,
    pub allow_ticket_sale: bool,
    pub allowed_role_ids: Vec<i64>,
    pub layout_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct TillButton {
    pub id: i64,
    pub name: String,
    pub sequence_number: i32,
    pub product_ids: Vec<i64>,
}

/// Materialized terminal configuration returned by `get_terminal_config`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct TerminalConfig {
    pub till_id: i64,
    pub profile: TillProfile,
    pub buttons: Vec<TillButton>,
    pub ticket_sale_available: bool,
    pub active_cash_register_id: Option<i64>,
    pub user_tag_secret: Option<String>,
    pub sumup_affiliate_key: Option<String>,
}
