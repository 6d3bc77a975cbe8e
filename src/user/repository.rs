use sqlx::PgPool;

use crate::error::CoreError;
use super::models::{CurrentUser, Privilege, Role, User, UserInfo};

pub struct UserRepository;

impl UserRepository {
    pub async fn find_by_user_tag_uid(pool: &PgPool, uid: i64) -> Result<Option<User>, CoreError> {
        let row = sqlx::query!(
            r#"select u.id, u.login, u.display_name, u.user_tag_id, u.cashier_account_id, u.transport_account_id
               from usr u join user_tag t on u.user_tag_id = t.id
               where t.uid = $1"#,
            uid
        )
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|r| User {
            id: r.id,
            login: r.login,
            display_name: r.display_name,
            user_tag_id: r.user_tag_id,
            cashier_account_id: r.cashier_account_id,
            transport_account_id: r.transport_account_id,
        }))
    }

    pub async fn find_by_id(pool: &PgPool, user_id: i64) -> Result<Option<User>, CoreError> {
        let row = sqlx::query!(
            "select id, login, display_name, user_tag_id, cashier_account_id, transport_account_id from usr where id = $1",
            user_id
        )
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|r| User {
            id: r.id,
            login: r.login,
            display_name: r.display_name,
            user_tag_id: r.user_tag_id,
            cashier_account_id: r.cashier_account_id,
            transport_account_id: r.transport_account_id,
        }))
    }

    /// Roles assigned to this user, with their privilege set loaded.
    pub async fn roles_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<Role>, CoreError> {
        let rows = sqlx::query!(
            r#"select r.id, r.name, r.is_privileged,
                      array_remove(array_agg(rp.privilege), null) as "privileges!: Vec<Privilege>"
               from user_role_assoc ura
               join user_role r on ura.role_id = r.id
               left join user_role_to_privilege rp on rp.role_id = r.id
               where ura.user_id = $1
               group by r.id, r.name, r.is_privileged"#,
            user_id
        )
        .fetch_all(pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| Role { id: r.id, name: r.name, is_privileged: r.is_privileged, privileges: r.privileges })
            .collect())
    }

    pub async fn get_user_info(pool: &PgPool, user: &User) -> Result<UserInfo, CoreError> {
        let cashier_balance = match user.cashier_account_id {
            Some(id) => sqlx::query_scalar!("select balance from account where id = $1", id)
                .fetch_one(pool)
                .await?,
            None => rust_decimal::Decimal::ZERO,
        };
        let transport_balance = match user.transport_account_id {
            Some(id) => Some(
                sqlx::query_scalar!("select balance from account where id = $1", id)
                    .fetch_one(pool)
                    .await?,
            ),
            None => None,
        };
        let cash_register_id = sqlx::query_scalar!(
            "select cash_register_id from cashier_cash_register_mapping where cashier_id = $1",
            user.id
        )
        .fetch_optional(pool)
        .await?
        .flatten();
        Ok(UserInfo { user: user.clone(), cashier_account_balance: cashier_balance, transport_account_balance: transport_balance, cash_register_id })
    }
}

/// Picks the first role in `roles` matching `role_id`, materializing the `CurrentUser` a
/// terminal session operates as.
pub fn materialize_current_user(user: User, roles: &[Role], role_id: i64) -> Result<CurrentUser, CoreError> {
    let role = roles
        .iter()
        .find(|r| r.id == role_id)
        .cloned()
        .ok_or_else(|| CoreError::invalid_argument("role not assigned to user"))?;
    Ok(CurrentUser { user, role })
}
