//! Till / terminal runtime: registration handshake, user login state machine, and the
//! terminal config materialization consumed by the point-of-sale client.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::CoreError;
use crate::user::{materialize_current_user, CurrentUser, Privilege, UserRepository};
use super::models::{TerminalConfig, Till, TillButton, TillProfile};

pub struct TillService {
    pool: PgPool,
}

impl TillService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_till(&self, till_id: i64) -> Result<Till, CoreError> {
        let row = sqlx::query!(
            r#"select id, name, active_profile_id, active_user_id, active_user_role_id,
                      active_cash_register_id, registration_uuid, session_uuid
               from till where id = $1"#,
            till_id
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CoreError::not_found("till", till_id.to_string()))?;
        Ok(Till {
            id: row.id,
            name: row.name,
            active_profile_id: row.active_profile_id,
            active_user_id: row.active_user_id,
            active_user_role_id: row.active_user_role_id,
            active_cash_register_id: row.active_cash_register_id,
            registration_uuid: row.registration_uuid,
            session_uuid: row.session_uuid,
        })
    }

    /// Consumes the one-shot `registration_uuid`, mints the terminal bearer identity.
    pub async fn register_terminal(&self, registration_uuid: Uuid) -> Result<(i64, Uuid), CoreError> {
        let session_uuid = Uuid::new_v4();
        let row = sqlx::query!(
            r#"update till set registration_uuid = null, session_uuid = $2
               where registration_uuid = $1
               returning id"#,
            registration_uuid,
            session_uuid
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CoreError::invalid_argument("unknown or already-consumed registration code"))?;
        Ok((row.id, session_uuid))
    }

    /// Tears down the terminal's session and mints a fresh one-shot `registration_uuid`, so
    /// the till is re-registerable without an admin having to do it by hand.
    pub async fn logout_terminal(&self, till_id: i64) -> Result<(), CoreError> {
        sqlx::query!(
            r#"update till set session_uuid = null, registration_uuid = gen_random_uuid(),
                      active_user_id = null, active_user_role_id = null where id = $1"#,
            till_id
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Roles the tag's user may log in as on this till: (user's roles) ∩ (profile-allowed
    /// roles) ∩ (roles carrying a login privilege).
    pub async fn check_user_login(
        &self,
        till_id: i64,
        user_tag_uid: i64,
        currently_logged_in: Option<&CurrentUser>,
    ) -> Result<Vec<crate::user::Role>, CoreError> {
        let till = self.fetch_till(till_id).await?;
        let profile = self.fetch_profile(till.active_profile_id).await?;

        let user = UserRepository::find_by_user_tag_uid(&self.pool, user_tag_uid)
            .await?
            .ok_or_else(|| CoreError::invalid_argument("unknown user tag"))?;
        let roles = UserRepository::roles_for_user(&self.pool, user.id).await?;

        let candidate_roles: Vec<_> = roles
            .into_iter()
            .filter(|r| profile.allowed_role_ids.contains(&r.id))
            .filter(|r| r.has(Privilege::TerminalLogin) || r.has(Privilege::SupervisedTerminalLogin))
            .collect();

        let candidate_is_supervisor = candidate_roles.iter().any(|r| r.can_log_in_unsupervised());
        if !candidate_is_supervisor {
            let ok = currently_logged_in.map(|cu| cu.requires(Privilege::TerminalLogin)).unwrap_or(false);
            if !ok {
                return Err(CoreError::AccessDenied { message: "supervisor required".to_string() });
            }
        }
        Ok(candidate_roles)
    }

    /// `role_id` must be one returned by `check_user_login`, and must additionally be
    /// allowed for the till's active profile — a second, independent check guarding a race
    /// between the two calls.
    pub async fn login_user(
        &self,
        till_id: i64,
        user_tag_uid: i64,
        role_id: i64,
        currently_logged_in: Option<&CurrentUser>,
    ) -> Result<CurrentUser, CoreError> {
        let till = self.fetch_till(till_id).await?;
        let profile = self.fetch_profile(till.active_profile_id).await?;
        if !profile.allowed_role_ids.contains(&role_id) {
            return Err(CoreError::AccessDenied { message: "role not permitted on this till profile".to_string() });
        }

        let candidate_roles = self.check_user_login(till_id, user_tag_uid, currently_logged_in).await?;
        let user = UserRepository::find_by_user_tag_uid(&self.pool, user_tag_uid)
            .await?
            .ok_or_else(|| CoreError::invalid_argument("unknown user tag"))?;
        let current = materialize_current_user(user, &candidate_roles, role_id)?;

        sqlx::query!(
            "update till set active_user_id = $2, active_user_role_id = $3 where id = $1",
            till_id,
            current.user.id,
            role_id
        )
        .execute(&self.pool)
        .await?;
        Ok(current)
    }

    pub async fn logout_user(&self, till_id: i64) -> Result<(), CoreError> {
        sqlx::query!("update till set active_user_id = null, active_user_role_id = null where id = $1", till_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Privileged variant of `logout_user`: callable against any till regardless of who is
    /// logged in.
    pub async fn force_logout_user(&self, acting_as: &CurrentUser, till_id: i64) -> Result<(), CoreError> {
        if !acting_as.requires(Privilege::TillManagement) {
            return Err(CoreError::AccessDenied { message: "till_management required".to_string() });
        }
        self.logout_user(till_id).await
    }

    pub async fn get_user_info(
        &self,
        acting_as: &CurrentUser,
        user_tag_uid: i64,
    ) -> Result<crate::user::UserInfo, CoreError> {
        let user = UserRepository::find_by_user_tag_uid(&self.pool, user_tag_uid)
            .await?
            .ok_or_else(|| CoreError::not_found("user", user_tag_uid.to_string()))?;

        let is_self = acting_as.user.id == user.id;
        let is_privileged =
            acting_as.requires(Privilege::CashierManagement) || acting_as.requires(Privilege::UserManagement);
        if !is_self && !is_privileged {
            return Err(CoreError::AccessDenied { message: "not authorized to view this user".to_string() });
        }
        UserRepository::get_user_info(&self.pool, &user).await
    }

    async fn fetch_profile(&self, profile_id: i64) -> Result<TillProfile, CoreError> {
        let row = sqlx::query!(
            r#"select id, name, allow_top_up, allow_cash_out, allow_ticket_sale, layout_id,
                      coalesce(array_agg(rta.role_id) filter (where rta.role_id is not null), '{}') as "allowed_role_ids!"
               from till_profile p
               left join till_profile_to_role rta on rta.profile_id = p.id
               where p.id = $1
               group by p.id"#,
            profile_id
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CoreError::not_found("till_profile", profile_id.to_string()))?;
        Ok(TillProfile {
            id: row.id,
            name: row.name,
            allow_top_up: row.allow_top_up,
            allow_cash_out: row.allow_cash_out,
            allow_ticket_sale: row.allow_ticket_sale,
            allowed_role_ids: row.allowed_role_ids,
            layout_id: row.layout_id,
        })
    }

    /// Profile, buttons, and terminal secrets. Secrets are only included when the profile
    /// enables top-up or ticket sale, mirroring the collaborator handshake the gateway
    /// performs with the terminal-secret provider.
    pub async fn get_terminal_config(&self, till_id: i64) -> Result<TerminalConfig, CoreError> {
        let till = self.fetch_till(till_id).await?;
        let profile = self.fetch_profile(till.active_profile_id).await?;

        let buttons = if let Some(layout_id) = profile.layout_id {
            sqlx::query!(
                r#"select b.id, b.name, lb.sequence_number,
                          coalesce(array_agg(bp.product_id), '{}') as "product_ids!"
                   from till_layout_to_button lb
                   join till_button b on b.id = lb.button_id
                   left join till_button_to_product bp on bp.button_id = b.id
                   where lb.layout_id = $1
                   group by b.id, b.name, lb.sequence_number
                   order by lb.sequence_number"#,
                layout_id
            )
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|r| TillButton { id: r.id, name: r.name, sequence_number: r.sequence_number, product_ids: r.product_ids })
            .collect()
        } else {
            Vec::new()
        };

        let layout_has_tickets = match profile.layout_id {
            Some(layout_id) => sqlx::query_scalar!(
                "select exists (select from till_layout_to_ticket where layout_id = $1)",
                layout_id
            )
            .fetch_one(&self.pool)
            .await?
            .unwrap_or(false),
            None => false,
        };
        let allow_secrets = profile.allow_top_up || profile.allow_ticket_sale;

        Ok(TerminalConfig {
            till_id,
            ticket_sale_available: profile.allow_ticket_sale && layout_has_tickets,
            buttons,
            active_cash_register_id: till.active_cash_register_id,
            user_tag_secret: if allow_secrets { Some("<user-tag-hmac-key>".to_string()) } else { None },
            sumup_affiliate_key: if allow_secrets { Some("<sumup-affiliate-key>".to_string()) } else { None },
            profile,
        })
    }

    /// Moves the physical registration/session identity off `from_till_id` and onto
    /// `to_till_id`, leaving `from_till_id` unregistered with a fresh one-shot registration
    /// code — the same minting `logout_terminal` does.
    async fn rebind(&self, acting_as: &CurrentUser, from_till_id: i64, to_till_id: i64) -> Result<(), CoreError> {
        if !acting_as.requires(Privilege::TillManagement) {
            return Err(CoreError::AccessDenied { message: "till_management required".to_string() });
        }
        if from_till_id == to_till_id {
            return Err(CoreError::invalid_argument("cannot rebind a till to itself"));
        }
        let source = self.fetch_till(from_till_id).await?;

        let mut tx = self.pool.begin().await.map_err(CoreError::from)?;
        let affected = sqlx::query!(
            r#"update till set session_uuid = $2, registration_uuid = null,
                      active_user_id = $3, active_user_role_id = $4, active_cash_register_id = $5
               where id = $1"#,
            to_till_id,
            source.session_uuid,
            source.active_user_id,
            source.active_user_role_id,
            source.active_cash_register_id
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if affected == 0 {
            return Err(CoreError::not_found("till", to_till_id.to_string()));
        }
        sqlx::query!(
            r#"update till set session_uuid = null, registration_uuid = gen_random_uuid(),
                      active_user_id = null, active_user_role_id = null, active_cash_register_id = null
               where id = $1"#,
            from_till_id
        )
        .execute(&mut *tx)
        .await?;
        tx.commit().await.map_err(CoreError::from)?;
        Ok(())
    }

    /// The physical terminal currently registered on `till_id` now operates as `new_till_id`;
    /// `till_id` is left unregistered, ready to be handed to a different terminal. Privileged.
    pub async fn switch_till(&self, acting_as: &CurrentUser, till_id: i64, new_till_id: i64) -> Result<(), CoreError> {
        self.rebind(acting_as, till_id, new_till_id).await
    }

    /// Inverse of `switch_till`: `till_id` now runs on whatever terminal was previously
    /// registered on `new_terminal_till_id`. Privileged.
    pub async fn switch_terminal(
        &self,
        acting_as: &CurrentUser,
        till_id: i64,
        new_terminal_till_id: i64,
    ) -> Result<(), CoreError> {
        self.rebind(acting_as, new_terminal_till_id, till_id).await
    }
}
