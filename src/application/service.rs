use crate::domain::account::{Account, AccountId};
use crate::domain::transfer::{TransferId, TransferRecord};
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Operations on accounts and transfers exposed to transports.
#[async_trait]
pub trait WalletService: Send + Sync {
    /// Lists all accounts ordered by identifier.
    async fn list_accounts(&self) -> Result<Vec<Account>>;

    /// Lists all committed transfers, oldest first.
    async fn list_transfers(&self) -> Result<Vec<TransferRecord>>;

    /// Moves `amount` from `source` to `destination` atomically.
    ///
    /// Both accounts must exist and share a currency, and the source must not
    /// go negative. Retrying a successful call records a second transfer.
    async fn transfer(
        &self,
        source: &AccountId,
        destination: &AccountId,
        amount: Decimal,
    ) -> Result<TransferId>;
}

pub type SharedWalletService = Arc<dyn WalletService>;
