//! Terminal HTTP surface: bearer token equals the till's `session_uuid`.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiResponse, CoreError, CoreResult};
use crate::order::{CompletedOrder, NewOrder};
use super::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register_terminal", post(register_terminal))
        .route("/user/check-login", post(check_login))
        .route("/user/login", post(login))
        .route("/user/logout", post(logout))
        .route("/order", post(create_order))
        .route("/order/{order_id}/book", post(book_order))
        .route("/order/{order_id}/cancel", post(cancel_order))
        .route("/config", get(terminal_config))
        .route("/customer/{tag_uid}", get(customer_lookup))
}

async fn till_id_from_bearer(pool: &sqlx::PgPool, headers: &axum::http::HeaderMap) -> Result<i64, CoreError> {
    let token = bearer_token(headers)?;
    let uuid = Uuid::parse_str(&token).map_err(|_| CoreError::AccessDenied { message: "malformed bearer token".to_string() })?;
    sqlx::query_scalar!("select id from till where session_uuid = $1", uuid)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| CoreError::AccessDenied { message: "unknown terminal session".to_string() })
}

fn bearer_token(headers: &axum::http::HeaderMap) -> Result<String, CoreError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
        .ok_or_else(|| CoreError::AccessDenied { message: "missing bearer token".to_string() })
}

#[derive(Debug, Deserialize)]
struct RegisterTerminalRequest {
    registration_uuid: Uuid,
}

async fn register_terminal(
    State(state): State<AppState>,
    Json(req): Json<RegisterTerminalRequest>,
) -> CoreResult<Json<ApiResponse<serde_json::Value>>> {
    let (till_id, session_uuid) = state.till.register_terminal(req.registration_uuid).await?;
    Ok(Json(ApiResponse::new(serde_json::json!({ "till_id": till_id, "session_uuid": session_uuid }))))
}

#[derive(Debug, Deserialize)]
struct CheckLoginRequest {
    user_tag_uid: i64,
}

async fn check_login(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Json(req): Json<CheckLoginRequest>,
) -> CoreResult<Json<ApiResponse<Vec<crate::user::Role>>>> {
    let till_id = till_id_from_bearer(&state.pool, &headers).await?;
    let roles = state.till.check_user_login(till_id, req.user_tag_uid, None).await?;
    Ok(Json(ApiResponse::new(roles)))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    user_tag_uid: i64,
    role_id: i64,
}

async fn login(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Json(req): Json<LoginRequest>,
) -> CoreResult<Json<ApiResponse<crate::user::CurrentUser>>> {
    let till_id = till_id_from_bearer(&state.pool, &headers).await?;
    let current = state.till.login_user(till_id, req.user_tag_uid, req.role_id, None).await?;
    Ok(Json(ApiResponse::new(current)))
}

async fn logout(State(state): State<AppState>, headers: axum::http::HeaderMap) -> CoreResult<StatusCode> {
    let till_id = till_id_from_bearer(&state.pool, &headers).await?;
    state.till.logout_user(till_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_order(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Json(new_order): Json<NewOrder>,
) -> CoreResult<Json<ApiResponse<CompletedOrder>>> {
    let till_id = till_id_from_bearer(&state.pool, &headers).await?;
    // The cashier is the till's currently logged-in user; resolved here rather than
    // trusted from the request body.
    let cashier_id = sqlx::query_scalar!("select active_user_id from till where id = $1", till_id)
        .fetch_one(&state.pool)
        .await?
        .ok_or_else(|| CoreError::AccessDenied { message: "no user logged in on this terminal".to_string() })?;
    let order = state.order.create_order(till_id, cashier_id, new_order).await?;
    Ok(Json(ApiResponse::new(order)))
}

async fn book_order(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Path(order_id): Path<i64>,
) -> CoreResult<Json<ApiResponse<serde_json::Value>>> {
    till_id_from_bearer(&state.pool, &headers).await?;
    let new_balance = state.order.book_order(order_id).await?;
    Ok(Json(ApiResponse::new(serde_json::json!({ "new_balance": new_balance }))))
}

async fn cancel_order(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Path(order_id): Path<i64>,
) -> CoreResult<StatusCode> {
    till_id_from_bearer(&state.pool, &headers).await?;
    state.order.cancel_order(order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn terminal_config(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> CoreResult<Json<ApiResponse<crate::till::TerminalConfig>>> {
    let till_id = till_id_from_bearer(&state.pool, &headers).await?;
    let config = state.till.get_terminal_config(till_id).await?;
    Ok(Json(ApiResponse::new(config)))
}

async fn customer_lookup(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Path(tag_uid): Path<i64>,
) -> CoreResult<Json<ApiResponse<serde_json::Value>>> {
    till_id_from_bearer(&state.pool, &headers).await?;
    let row = sqlx::query!(
        r#"select a.id, a.balance from user_tag t join account a on t.id = a.user_tag_id where t.uid = $1"#,
        tag_uid
    )
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| CoreError::not_found("customer", tag_uid.to_string()))?;
    Ok(Json(ApiResponse::new(serde_json::json!({ "account_id": row.id, "balance": row.balance }))))
}
