//! Customer portal HTTP surface: bearer token equals the customer session token minted by
//! `login_customer`.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::customer::CustomerBank;
use crate::error::{ApiResponse, CoreError, CoreResult};
use super::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/customer", get(customer_info))
        .route("/orders-with-bon", get(orders_with_bon))
        .route("/payout-info", get(payout_info))
        .route("/bon/{id}", get(get_bon))
        .route("/customer/info", post(update_info))
        .route("/customer/donate-all", post(donate_all))
        .route("/config", get(api_config))
}

async fn customer_id_from_bearer(pool: &sqlx::PgPool, headers: &axum::http::HeaderMap) -> Result<(i64, Uuid), CoreError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| CoreError::AccessDenied { message: "missing bearer token".to_string() })?;
    let uuid = Uuid::parse_str(token).map_err(|_| CoreError::AccessDenied { message: "malformed bearer token".to_string() })?;
    let customer_account_id = sqlx::query_scalar!("select customer_account_id from customer_session where token = $1", uuid)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| CoreError::AccessDenied { message: "session expired or unknown".to_string() })?;
    Ok((customer_account_id, uuid))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    pin: String,
}

async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> CoreResult<Json<ApiResponse<serde_json::Value>>> {
    let (customer_account_id, token) = state.customer.login_customer(&req.pin).await?;
    Ok(Json(ApiResponse::new(serde_json::json!({ "customer_account_id": customer_account_id, "token": token }))))
}

async fn logout(State(state): State<AppState>, headers: axum::http::HeaderMap) -> CoreResult<StatusCode> {
    let (customer_account_id, token) = customer_id_from_bearer(&state.pool, &headers).await?;
    state.customer.logout_customer(customer_account_id, token).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn customer_info(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> CoreResult<Json<ApiResponse<crate::customer::CustomerInfo>>> {
    let (customer_account_id, _) = customer_id_from_bearer(&state.pool, &headers).await?;
    let info = state.customer.get_customer_info(customer_account_id).await?;
    Ok(Json(ApiResponse::new(info)))
}

async fn orders_with_bon(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> CoreResult<Json<ApiResponse<serde_json::Value>>> {
    let (customer_account_id, _) = customer_id_from_bearer(&state.pool, &headers).await?;
    let orders = state.customer.get_orders_with_bon(customer_account_id).await?;
    let payload: Vec<_> = orders
        .into_iter()
        .map(|(order, has_bon)| serde_json::json!({ "order": order, "has_bon": has_bon }))
        .collect();
    Ok(Json(ApiResponse::new(serde_json::json!(payload))))
}

async fn payout_info(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> CoreResult<Json<ApiResponse<crate::customer::PayoutInfo>>> {
    let (customer_account_id, _) = customer_id_from_bearer(&state.pool, &headers).await?;
    let info = state.customer.payout_info(customer_account_id).await?;
    Ok(Json(ApiResponse::new(info)))
}

async fn get_bon(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Path(bon_id): Path<i64>,
) -> CoreResult<axum::response::Response> {
    use axum::response::IntoResponse;
    let (customer_account_id, _) = customer_id_from_bearer(&state.pool, &headers).await?;
    let (mime_type, content) = state.customer.get_bon(customer_account_id, bon_id).await?;
    Ok(([(header::CONTENT_TYPE, mime_type)], content).into_response())
}

async fn update_info(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Query(query): Query<ApiConfigQuery>,
    Json(bank): Json<CustomerBank>,
) -> CoreResult<StatusCode> {
    let (customer_account_id, _) = customer_id_from_bearer(&state.pool, &headers).await?;
    let config = state.customer.get_api_config(&query.base_url).await;
    let (allowed_codes, sepa_enabled) = match config {
        Ok(c) => (c.sepa_allowed_country_codes, c.sepa_enabled),
        Err(_) => (Vec::new(), true),
    };
    state
        .customer
        .update_customer_info(customer_account_id, bank, &allowed_codes, sepa_enabled)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn donate_all(State(state): State<AppState>, headers: axum::http::HeaderMap) -> CoreResult<StatusCode> {
    let (customer_account_id, _) = customer_id_from_bearer(&state.pool, &headers).await?;
    state.customer.update_customer_info_donate_all(customer_account_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct ApiConfigQuery {
    base_url: String,
}

async fn api_config(
    State(state): State<AppState>,
    Query(query): Query<ApiConfigQuery>,
) -> CoreResult<Json<ApiResponse<crate::customer::ApiConfig>>> {
    let config = state.customer.get_api_config(&query.base_url).await?;
    Ok(Json(ApiResponse::new(config)))
}
