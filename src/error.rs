//! # error
//!
//! Top-level API error. Wraps every component error so handlers can use `?`
//! throughout; the `IntoResponse` impl turns it into a JSON body carrying the
//! stable error code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::bridge::BridgeError;
use crate::config::ConfigError;
use crate::ledger::LedgerError;
use crate::market_resolve::MarketError;
use crate::oracle::OracleError;
use crate::quorum::WalletError;
use crate::rpc::SignedCallError;
use crate::shares::ShareError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Disabled: {0}")]
    Disabled(String),

    #[error(transparent)]
    Market(#[from] MarketError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Shares(#[from] ShareError),

    #[error(transparent)]
    SignedCall(#[from] SignedCallError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::NotFound(_) => "NotFound",
            ApiError::Disabled(_) => "Disabled",
            ApiError::Market(err) => err.code(),
            ApiError::Wallet(err) => err.code(),
            ApiError::Bridge(err) => err.code(),
            ApiError::Oracle(err) => err.code(),
            ApiError::Ledger(err) => err.code(),
            ApiError::Shares(err) => err.code(),
            ApiError::SignedCall(err) => err.code(),
            ApiError::Config(err) => err.code(),
            ApiError::Internal(_) => "Internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        if let ApiError::SignedCall(_) = self {
            return StatusCode::UNAUTHORIZED;
        }
        match self.code() {
            "NotFound" | "MarketNotFound" | "TransactionNotFound" | "UnknownAssertion" => StatusCode::NOT_FOUND,
            "Unauthorized" | "NotASigner" | "Disabled" => StatusCode::FORBIDDEN,
            "InvalidState" | "MarketClosed" | "MarketNotEnded" | "AlreadyAsserted" | "AlreadyClaimed"
            | "AlreadyWithdrawn" | "AlreadySigned" | "AlreadyExecuted" | "AlreadySettled" | "NotSettled"
            | "QuorumNotMet" | "CooldownActive" => StatusCode::CONFLICT,
            "Internal" => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "request rejected");
        }

        let body = Json(json!({
            "ok":    false,
            "code":  self.code(),
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
