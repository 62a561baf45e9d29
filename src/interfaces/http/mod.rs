//! JSON-over-HTTP transport for the wallet service.
//!
//! - `GET  /accounts` lists accounts
//! - `GET  /payments` lists payments, two entries per transfer
//! - `POST /payments` sends a payment

pub mod dto;

use crate::application::service::SharedWalletService;
use crate::error::{ErrorKind, WalletError};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use dto::{
    ErrorResponse, ListAccountsResponse, ListPaymentsResponse, SendPaymentRequest,
    SendPaymentResponse,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Builds the router for `wallet`.
pub fn router(wallet: SharedWalletService) -> Router {
    Router::new()
        .route("/accounts", get(list_accounts))
        .route("/payments", get(list_payments).post(send_payment))
        .with_state(wallet)
}

/// Serves `wallet` on `addr` until the listener fails or a shutdown signal arrives.
pub async fn serve(wallet: SharedWalletService, addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(transport = "HTTP", addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router(wallet))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "failed to listen for shutdown signal"),
    }
}

/// Maps each error kind to its HTTP status.
pub fn status_code(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::AccountsNotSpecified | ErrorKind::MalformedRequest => StatusCode::BAD_REQUEST,
        ErrorKind::SameAccount
        | ErrorKind::InvalidAmount
        | ErrorKind::CurrencyMismatch
        | ErrorKind::InsufficientBalance => StatusCode::FORBIDDEN,
        ErrorKind::AccountNotFound => StatusCode::NOT_FOUND,
        ErrorKind::StoreUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Error wrapper rendering `{"error": message}`; internal details are
/// logged and replaced with a generic message.
pub struct ApiError(WalletError);

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_code(self.0.kind());
        let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(component = "HTTP", error = %self.0, "request failed");
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn list_accounts(State(wallet): State<SharedWalletService>) -> ApiResult<ListAccountsResponse> {
    let accounts = wallet.list_accounts().await?;
    Ok(Json(ListAccountsResponse { accounts }))
}

async fn list_payments(State(wallet): State<SharedWalletService>) -> ApiResult<ListPaymentsResponse> {
    let transfers = wallet.list_transfers().await?;
    Ok(Json(ListPaymentsResponse::from_transfers(transfers)))
}

async fn send_payment(
    State(wallet): State<SharedWalletService>,
    body: Bytes,
) -> ApiResult<SendPaymentResponse> {
    let req: SendPaymentRequest =
        serde_json::from_slice(&body).map_err(|_| WalletError::MalformedRequest)?;
    wallet
        .transfer(&req.from_account_id, &req.to_account_id, req.amount)
        .await?;
    Ok(Json(SendPaymentResponse::sent()))
}
