use super::service::WalletService;
use crate::domain::account::{Account, AccountId};
use crate::domain::transfer::{TransferId, TransferRecord};
use crate::error::{Result, WalletError};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Wraps a [`WalletService`] and records the outcome of every call.
pub struct LoggingWallet<W> {
    next: W,
}

impl<W: WalletService> LoggingWallet<W> {
    pub fn new(next: W) -> Self {
        Self { next }
    }
}

fn log_listing(method: &'static str, result: std::result::Result<usize, &WalletError>) {
    match result {
        Ok(count) => tracing::info!(method, count, "listed"),
        Err(e) => tracing::error!(method, error = %e, "listing failed"),
    }
}

#[async_trait]
impl<W: WalletService> WalletService for LoggingWallet<W> {
    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let result = self.next.list_accounts().await;
        log_listing("list_accounts", result.as_ref().map(Vec::len));
        result
    }

    async fn list_transfers(&self) -> Result<Vec<TransferRecord>> {
        let result = self.next.list_transfers().await;
        log_listing("list_transfers", result.as_ref().map(Vec::len));
        result
    }

    async fn transfer(
        &self,
        source: &AccountId,
        destination: &AccountId,
        amount: Decimal,
    ) -> Result<TransferId> {
        let result = self.next.transfer(source, destination, amount).await;
        match &result {
            Ok(transfer_id) => tracing::info!(
                method = "transfer",
                %source,
                %destination,
                %amount,
                %transfer_id,
                "transfer committed"
            ),
            Err(e) if e.is_business() => tracing::warn!(
                method = "transfer",
                %source,
                %destination,
                %amount,
                error = %e,
                "transfer rejected"
            ),
            Err(e) => tracing::error!(
                method = "transfer",
                %source,
                %destination,
                %amount,
                error = %e,
                "transfer failed"
            ),
        }
        result
    }
}
