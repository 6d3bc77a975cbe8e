//! Crate-wide error type and HTTP envelope.
//!
//! `ledger::LedgerError` converts into `CoreError` via a manual `From` impl. The order/till/customer/
//! payout services have no leg of logic that needs a distinct leaf error shape of their own
//! (every failure they raise already maps directly onto one of the variants below), so they
//! return `CoreError` directly rather than carrying a parallel per-module enum. `CoreError` is
//! the only error type the gateway handlers see.

use axum::{Json, http::StatusCode, response::IntoResponse};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{message}")]
    InvalidArgument { message: String },

    #[error("{message}")]
    AccessDenied { message: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("insufficient funds: needed {needed}, available {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    #[error("products {product_ids:?} are age-restricted")]
    AgeRestriction { product_ids: Vec<i64> },

    #[error("order {order_id} is already finished")]
    AlreadyFinished { order_id: i64 },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl CoreError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument { message: message.into() }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }

    /// Stable machine-readable identifier, as named in the error taxonomy.
    pub fn id(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "InvalidArgument",
            Self::AccessDenied { .. } => "AccessDenied",
            Self::NotFound { .. } => "NotFound",
            Self::Conflict { .. } => "Conflict",
            Self::InsufficientFunds { .. } => "InsufficientFunds",
            Self::AgeRestriction { .. } => "AgeRestriction",
            Self::AlreadyFinished { .. } => "AlreadyFinished",
            Self::Internal { .. } => "Internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
            Self::AccessDenied { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::AgeRestriction { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::AlreadyFinished { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Structured context fields carried alongside the message, per error kind.
    fn context(&self) -> serde_json::Value {
        match self {
            Self::InsufficientFunds { needed, available } => {
                serde_json::json!({ "needed_fund": needed, "available_fund": available })
            }
            Self::AgeRestriction { product_ids } => serde_json::json!({ "product_ids": product_ids }),
            Self::AlreadyFinished { order_id } => serde_json::json!({ "order_id": order_id }),
            Self::NotFound { entity, id } => serde_json::json!({ "entity": entity, "id": id }),
            _ => serde_json::Value::Null,
        }
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = err {
            return Self::NotFound { entity: "row", id: String::new() };
        }
        tracing::error!(error = %err, "database error");
        Self::Internal { message: "database error".to_string() }
    }
}

/// Unified JSON error body.
#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub id: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub context: serde_json::Value,
}

impl IntoResponse for CoreError {
    fn into_response(self) -> axum::response::Response {
        if matches!(self, CoreError::Internal { .. }) {
            tracing::error!(error = %self, "internal error, rolling back");
        }
        let status = self.status();
        let body = ApiErrorBody {
            id: self.id(),
            message: self.to_string(),
            context: self.context(),
        };
        (status, Json(body)).into_response()
    }
}

/// Unified success envelope mirroring the error body's shape.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::OK, Json(self.data)).into_response()
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_kinds_to_expected_status() {
        assert_eq!(CoreError::invalid_argument("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            CoreError::InsufficientFunds { needed: Decimal::ONE, available: Decimal::ZERO }.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(CoreError::internal("x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn id_matches_taxonomy() {
        assert_eq!(CoreError::AlreadyFinished { order_id: 1 }.id(), "AlreadyFinished");
        assert_eq!(CoreError::AgeRestriction { product_ids: vec![1] }.id(), "AgeRestriction");
    }
}
