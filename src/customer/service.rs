//! Customer portal core: self-service login, payout preferences, and read-only order
//! history for the public customer-facing surface.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::CoreError;
use crate::order::{Order, OrderStatus, OrderType};
use super::models::{ApiConfig, CustomerBank, CustomerInfo, PayoutInfo};

pub struct CustomerService {
    pool: PgPool,
}

impl CustomerService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Matches the tag's pin case-insensitively and opens a `customer_session` row.
    pub async fn login_customer(&self, pin: &str) -> Result<(i64, Uuid), CoreError> {
        let row = sqlx::query!(
            r#"select a.id as customer_account_id
               from user_tag t join account a on t.id = a.user_tag_id
               where lower(t.pin) = lower($1)"#,
            pin
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CoreError::AccessDenied { message: "no customer tag matches this pin".to_string() })?;

        let session_token = Uuid::new_v4();
        sqlx::query!(
            "insert into customer_session (token, customer_account_id, created_at) values ($1, $2, now())",
            session_token,
            row.customer_account_id
        )
        .execute(&self.pool)
        .await?;
        Ok((row.customer_account_id, session_token))
    }

    /// Deletes the session row if it still belongs to `customer_account_id`. Returns
    /// whether a row was actually removed, so a double-logout is observable but not an
    /// error.
    pub async fn logout_customer(&self, customer_account_id: i64, token: Uuid) -> Result<bool, CoreError> {
        let result = sqlx::query!(
            "delete from customer_session where token = $1 and customer_account_id = $2",
            token,
            customer_account_id
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_customer_info(&self, customer_account_id: i64) -> Result<CustomerInfo, CoreError> {
        let row = sqlx::query!(
            r#"select customer_account_id, iban, account_name, email, donation, donate_all,
                      has_entered_info, payout_run_id, payout_error, payout_export
               from customer_info where customer_account_id = $1"#,
            customer_account_id
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CoreError::not_found("customer_info", customer_account_id.to_string()))?;
        Ok(CustomerInfo {
            customer_account_id: row.customer_account_id,
            iban: row.iban,
            account_name: row.account_name,
            email: row.email,
            donation: row.donation,
            donate_all: row.donate_all,
            has_entered_info: row.has_entered_info,
            payout_run_id: row.payout_run_id,
            payout_error: row.payout_error,
            payout_export: row.payout_export,
        })
    }

    /// Fails with `InvalidArgument`, not `Conflict`, matching the original service: once a
    /// payout run has claimed this customer the bank details are frozen.
    async fn check_no_payout_run(&self, customer_account_id: i64) -> Result<(), CoreError> {
        let assigned = sqlx::query_scalar!(
            "select payout_run_id from customer_info where customer_account_id = $1",
            customer_account_id
        )
        .fetch_optional(&self.pool)
        .await?
        .flatten();
        if assigned.is_some() {
            return Err(CoreError::invalid_argument("a payout run has already been scheduled for this account"));
        }
        Ok(())
    }

    pub async fn update_customer_info(
        &self,
        customer_account_id: i64,
        bank: CustomerBank,
        sepa_allowed_country_codes: &[String],
        sepa_enabled: bool,
    ) -> Result<(), CoreError> {
        self.check_no_payout_run(customer_account_id).await?;
        if !sepa_enabled {
            return Err(CoreError::invalid_argument("SEPA payout is not enabled for this event"));
        }
        let iban = bank.validated_iban()?;
        if !sepa_allowed_country_codes.iter().any(|c| c == iban.country_code()) {
            return Err(CoreError::invalid_argument("IBAN country is not allowed for this event"));
        }
        let email = bank.validated_email()?;

        let balance = sqlx::query_scalar!("select balance from account where id = $1", customer_account_id)
            .fetch_one(&self.pool)
            .await?;
        if bank.donation < Decimal::ZERO || bank.donation > balance {
            return Err(CoreError::invalid_argument("donation must be between zero and the account balance"));
        }
        let donation = bank.donation.round_dp(2);

        sqlx::query!(
            r#"insert into customer_info (customer_account_id, iban, account_name, email, donation, donate_all, has_entered_info)
               values ($1, $2, $3, $4, $5, false, true)
               on conflict (customer_account_id) do update set
                 iban = excluded.iban, account_name = excluded.account_name, email = excluded.email,
                 donation = excluded.donation, donate_all = false, has_entered_info = true"#,
            customer_account_id,
            iban.as_str(),
            bank.account_name,
            email,
            donation
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn update_customer_info_donate_all(&self, customer_account_id: i64) -> Result<(), CoreError> {
        self.check_no_payout_run(customer_account_id).await?;
        sqlx::query!(
            r#"insert into customer_info (customer_account_id, donation, donate_all, has_entered_info)
               values ($1, null, true, true)
               on conflict (customer_account_id) do update set
                 donation = null, donate_all = true, has_entered_info = true"#,
            customer_account_id
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn payout_info(&self, customer_account_id: i64) -> Result<PayoutInfo, CoreError> {
        let row = sqlx::query!(
            r#"select ci.payout_run_id, pr.execution_date
               from customer_info ci left join payout_run pr on pr.id = ci.payout_run_id
               where ci.customer_account_id = $1"#,
            customer_account_id
        )
        .fetch_optional(&self.pool)
        .await?;
        match row {
            None => Ok(PayoutInfo { in_payout_run: false, payout_date: None }),
            Some(r) => Ok(PayoutInfo { in_payout_run: r.payout_run_id.is_some(), payout_date: r.execution_date }),
        }
    }

    pub async fn get_orders_with_bon(&self, customer_account_id: i64) -> Result<Vec<(Order, bool)>, CoreError> {
        let rows = sqlx::query!(
            r#"select o.id, o.uuid, o.order_type as "order_type: OrderType", o.status as "status: OrderStatus",
                      o.cashier_id, o.till_id, o.customer_account_id, o.cash_register_id, o.booked_at,
                      o.itemcount, o.value_sum, o.value_tax, o.value_notax,
                      (b.id is not null) as "has_bon!"
               from ordr o left join bon b on b.id = o.id
               where o.customer_account_id = $1
               order by o.id desc"#,
            customer_account_id
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| {
                (
                    Order {
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
                    },
                    r.has_bon,
                )
            })
            .collect())
    }

    /// Ledger rows that moved funds out of the account to an exit account and were not
    /// part of a regular order — the payout leg itself.
    pub async fn get_payout_transactions(&self, customer_account_id: i64) -> Result<Vec<i64>, CoreError> {
        let rows = sqlx::query_scalar!(
            r#"select t.id
               from transaction t join account a on a.id = t.target_account
               where t.source_account = $1
                 and a.kind in ('sepa_exit', 'donation_exit')
                 and t.order_id is null"#,
            customer_account_id
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_bon(&self, customer_account_id: i64, bon_id: i64) -> Result<(String, Vec<u8>), CoreError> {
        let row = sqlx::query!(
            r#"select b.mime_type, b.content
               from bon b join ordr o on o.id = b.id
               where b.id = $1 and o.customer_account_id = $2"#,
            bon_id,
            customer_account_id
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CoreError::invalid_argument("no such bon for this account"))?;
        Ok((row.mime_type, row.content))
    }

    /// Read-only, unauthenticated portal config lookup keyed by the configured
    /// customer-portal base URL.
    pub async fn get_api_config(&self, base_url: &str) -> Result<ApiConfig, CoreError> {
        let row = sqlx::query!(
            r#"select test_mode, contact_email, about_page_url, data_privacy_url, sepa_enabled,
                      sumup_topup_enabled, sepa_allowed_country_codes, currency_identifier
               from event where customer_portal_url = $1"#,
            base_url
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CoreError::invalid_argument("no event is configured for this base url"))?;
        Ok(ApiConfig {
            test_mode: row.test_mode,
            contact_email: row.contact_email,
            about_page_url: row.about_page_url,
            data_privacy_url: row.data_privacy_url,
            sepa_enabled: row.sepa_enabled,
            sumup_topup_enabled: row.sumup_topup_enabled,
            sepa_allowed_country_codes: row.sepa_allowed_country_codes.unwrap_or_default(),
            currency_identifier: row.currency_identifier,
        })
    }
}
