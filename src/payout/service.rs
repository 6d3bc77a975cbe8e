//! Payout pipeline: run creation, CSV + SEPA XML export, and the retry/resume discipline
//! around partially-exported runs.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::path::Path;

use crate::error::CoreError;
use crate::money::format_two_decimals;
use super::models::{Payout, PayoutRun, SepaConfig};
use super::sepa;

pub struct PayoutService {
    pool: PgPool,
    sepa_config: SepaConfig,
}

pub struct ExportOptions {
    pub output_dir: std::path::PathBuf,
    pub dry_run: bool,
    pub max_payout_sum: Decimal,
    pub max_export_items_per_batch: Option<usize>,
    pub execution_date: NaiveDate,
    pub today: NaiveDate,
}

impl PayoutService {
    pub fn new(pool: PgPool, sepa_config: SepaConfig) -> Self {
        Self { pool, sepa_config }
    }

    /// Creates a run and atomically attaches every eligible customer whose running total,
    /// ordered by `customer_account_id`, stays under `max_payout_sum`.
    pub async fn create_payout_run(
        &self,
        created_by: i64,
        execution_date: NaiveDate,
        max_payout_sum: Decimal,
    ) -> Result<(i64, i64), CoreError> {
        let mut tx = self.pool.begin().await.map_err(CoreError::from)?;

        let run_id = sqlx::query_scalar!(
            "insert into payout_run (created_at, created_by, execution_date) values (now(), $1, $2) returning id",
            created_by,
            execution_date
        )
        .fetch_one(&mut *tx)
        .await?;

        let eligible = sqlx::query!(
            r#"select ci.customer_account_id, (a.balance - coalesce(ci.donation, 0)) as "amount!"
               from customer_info ci join account a on a.id = ci.customer_account_id
               where ci.payout_run_id is null
                 and ci.has_entered_info
                 and ci.payout_export
                 and ci.payout_error is null
                 and (a.balance - coalesce(ci.donation, 0)) > 0
               order by ci.customer_account_id"#
        )
        .fetch_all(&mut *tx)
        .await?;

        let mut running_total = Decimal::ZERO;
        let mut attached = 0i64;
        for row in eligible {
            if running_total + row.amount > max_payout_sum {
                break;
            }
            running_total += row.amount;
            sqlx::query!(
                "update customer_info set payout_run_id = $1 where customer_account_id = $2",
                run_id,
                row.customer_account_id
            )
            .execute(&mut *tx)
            .await?;
            attached += 1;
        }

        tx.commit().await.map_err(CoreError::from)?;
        Ok((run_id, attached))
    }

    async fn run_payouts(&self, run_id: i64) -> Result<Vec<Payout>, CoreError> {
        let rows = sqlx::query!(
            r#"select ci.customer_account_id, ci.iban as "iban!", ci.account_name as "account_name!",
                      ci.email, t.uid as "user_tag_uid!", (a.balance - coalesce(ci.donation, 0)) as "balance!"
               from customer_info ci
               join account a on a.id = ci.customer_account_id
               join user_tag t on t.id = a.user_tag_id
               where ci.payout_run_id = $1
               order by ci.customer_account_id"#,
            run_id
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| Payout {
                customer_account_id: r.customer_account_id,
                iban: r.iban,
                account_name: r.account_name,
                email: r.email,
                user_tag_uid: r.user_tag_uid,
                balance: r.balance,
            })
            .collect())
    }

    /// Creates a run, then emits one CSV for the whole run plus one SEPA XML per batch of
    /// at most `max_export_items_per_batch` customers. Rolls back (but keeps files already
    /// written to disk) when `dry_run` is set.
    pub async fn export_customer_payouts(
        &self,
        created_by: i64,
        options: ExportOptions,
    ) -> Result<(i64, usize), CoreError> {
        let (run_id, _attached) =
            self.create_payout_run(created_by, options.execution_date, options.max_payout_sum).await?;
        let payouts = self.run_payouts(run_id).await?;

        std::fs::create_dir_all(&options.output_dir)
            .map_err(|e| CoreError::internal(format!("could not create output directory: {e}")))?;
        self.write_csv(&options.output_dir, run_id, &payouts)?;

        let batch_size = options.max_export_items_per_batch.unwrap_or(payouts.len().max(1));
        for (batch_idx, batch) in payouts.chunks(batch_size.max(1)).enumerate() {
            let xml = sepa::render(batch, &self.sepa_config, options.execution_date, options.today)?;
            let path = options.output_dir.join(format!("payout_run_{run_id}_batch_{batch_idx}.xml"));
            std::fs::write(&path, xml).map_err(|e| CoreError::internal(format!("could not write SEPA XML: {e}")))?;
        }

        if options.dry_run {
            sqlx::query!("update customer_info set payout_run_id = null where payout_run_id = $1", run_id)
                .execute(&self.pool)
                .await?;
            sqlx::query!("delete from payout_run where id = $1", run_id).execute(&self.pool).await?;
        } else {
            sqlx::query!("update payout_run set set_done_at = now() where id = $1", run_id)
                .execute(&self.pool)
                .await?;
        }

        Ok((run_id, payouts.len()))
    }

    fn write_csv(&self, dir: &Path, run_id: i64, payouts: &[Payout]) -> Result<(), CoreError> {
        let mut out = String::from("beneficiary_name,iban,bic,amount,currency,reference,execution_date,uid,email,account_name\n");
        for payout in payouts {
            let reference = self.sepa_config.description_template.replace("{user_tag_uid}", &format!("0x{:08X}", payout.user_tag_uid));
            out.push_str(&format!(
                "{name},{iban},,{amount},{currency},{reference},,{uid},{email},{account_name}\n",
                name = payout.account_name,
                iban = payout.iban,
                amount = format_two_decimals(payout.balance),
                currency = self.sepa_config.currency,
                reference = reference,
                uid = payout.user_tag_uid,
                email = payout.email.clone().unwrap_or_default(),
                account_name = payout.account_name,
            ));
        }
        let path = dir.join(format!("payout_run_{run_id}.csv"));
        std::fs::write(path, out).map_err(|e| CoreError::internal(format!("could not write CSV: {e}")))
    }

    pub async fn get_run(&self, run_id: i64) -> Result<Option<PayoutRun>, CoreError> {
        let row = sqlx::query!(
            "select id, created_at, created_by, execution_date, set_done_at from payout_run where id = $1",
            run_id
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| PayoutRun {
            id: r.id,
            created_at: r.created_at,
            created_by: r.created_by,
            execution_date: r.execution_date,
            set_done_at: r.set_done_at,
        }))
    }
}
