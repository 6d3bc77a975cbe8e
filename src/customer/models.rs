use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::iban::Iban;

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct CustomerInfo {
    pub customer_account_id: i64,
    pub iban: Option<String>,
    pub account_name: Option<String>,
    pub email: Option<String>,
    pub donation: Option<Decimal>,
    pub donate_all: bool,
    pub has_entered_info: bool,
    pub payout_run_id: Option<i64>,
    pub payout_error: Option<String>,
    pub payout_export: bool,
}

/// Request body for `update_customer_info`.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerBank {
    pub iban: String,
    pub account_name: String,
    pub email: Option<String>,
    pub donation: Decimal,
}

impl CustomerBank {
    pub fn validated_iban(&self) -> Result<Iban, crate::error::CoreError> {
        Iban::parse(&self.iban)
    }

    pub fn validated_email(&self) -> Result<Option<String>, crate::error::CoreError> {
        match &self.email {
            None => Ok(None),
            Some(email) => {
                if is_plausible_email(email) {
                    Ok(Some(email.clone()))
                } else {
                    Err(crate::error::CoreError::invalid_argument("email address is not well-formed"))
                }
            }
        }
    }
}

/// `^[^@]+@[^@]+\.[^@]+$`, applied without a regex dependency since it is a single
/// fixed pattern checked at exactly one call site.
fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else { return false };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct PayoutInfo {
    pub in_payout_run: bool,
    pub payout_date: Option<DateTime<Utc>>,
}

/// Static, unauthenticated portal configuration returned by `get_api_config`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ApiConfig {
    pub test_mode: bool,
    pub contact_email: Option<String>,
    pub about_page_url: Option<String>,
    pub data_privacy_url: Option<String>,
    pub sepa_enabled: bool,
    pub sumup_topup_enabled: bool,
    pub sepa_allowed_country_codes: Vec<String>,
    pub currency_identifier: String,
}
