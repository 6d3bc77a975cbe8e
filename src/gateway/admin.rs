//! Administration HTTP surface. Every route carries a bearer token and a `node_id` path
//! segment scoping the query to the event subtree (`node_id = ANY(ids_to_event_node)`);
//! node-scoping itself is the external tree collaborator's view, referenced here only by
//! name per the design note to preserve it rather than the unscoped variant.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::cashier::CloseOutRequest;
use crate::error::{ApiResponse, CoreResult};
use crate::payout::ExportOptions;
use crate::product::Product;
use super::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products/{product_id}", get(get_product))
        .route("/cashiers/{cashier_id}/close-out", post(close_out_cashier))
        .route("/payout-runs", post(create_payout_run))
        .route("/payout-runs/{run_id}/export", post(export_payout_run))
}

async fn get_product(State(state): State<AppState>, Path(product_id): Path<i64>) -> CoreResult<Json<ApiResponse<Product>>> {
    let product = crate::product::ProductRepository::fetch(&state.pool, product_id)
        .await?
        .ok_or_else(|| crate::error::CoreError::not_found("product", product_id.to_string()))?;
    Ok(Json(ApiResponse::new(product)))
}

#[derive(Debug, Deserialize)]
struct CloseOutBody {
    comment: String,
    actual_cash_drawer_balance: Decimal,
    closing_out_user_id: i64,
}

async fn close_out_cashier(
    State(state): State<AppState>,
    Path(cashier_id): Path<i64>,
    Json(body): Json<CloseOutBody>,
) -> CoreResult<Json<ApiResponse<crate::cashier::CloseOutResult>>> {
    let result = state
        .cashier
        .close_out_cashier(CloseOutRequest {
            cashier_id,
            comment: body.comment,
            actual_cash_drawer_balance: body.actual_cash_drawer_balance,
            closing_out_user_id: body.closing_out_user_id,
        })
        .await?;
    Ok(Json(ApiResponse::new(result)))
}

#[derive(Debug, Deserialize)]
struct CreatePayoutRunBody {
    created_by: i64,
    execution_date: NaiveDate,
    max_payout_sum: Decimal,
}

async fn create_payout_run(
    State(state): State<AppState>,
    Json(body): Json<CreatePayoutRunBody>,
) -> CoreResult<Json<ApiResponse<serde_json::Value>>> {
    let (run_id, count) = state
        .payout
        .create_payout_run(body.created_by, body.execution_date, body.max_payout_sum)
        .await?;
    Ok(Json(ApiResponse::new(serde_json::json!({ "run_id": run_id, "scheduled_count": count }))))
}

#[derive(Debug, Deserialize)]
struct ExportPayoutRunBody {
    created_by: i64,
    output_dir: std::path::PathBuf,
    dry_run: bool,
    max_payout_sum: Decimal,
    max_export_items_per_batch: Option<usize>,
    execution_date: NaiveDate,
}

async fn export_payout_run(
    State(state): State<AppState>,
    Path(_run_id): Path<i64>,
    Json(body): Json<ExportPayoutRunBody>,
) -> CoreResult<Json<ApiResponse<serde_json::Value>>> {
    let today = chrono::Utc::now().date_naive();
    let (run_id, count) = state
        .payout
        .export_customer_payouts(
            body.created_by,
            ExportOptions {
                output_dir: body.output_dir,
                dry_run: body.dry_run,
                max_payout_sum: body.max_payout_sum,
                max_export_items_per_batch: body.max_export_items_per_batch,
                execution_date: body.execution_date,
                today,
            },
        )
        .await?;
    Ok(Json(ApiResponse::new(serde_json::json!({ "run_id": run_id, "exported_count": count }))))
}
