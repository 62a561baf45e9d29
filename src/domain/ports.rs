use super::account::{Account, AccountId, Amount, Balance};
use super::transfer::{TransferId, TransferRecord};
use crate::error::Result;
use async_trait::async_trait;

/// Shared ledger of accounts and committed transfer records.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Starts a new atomic unit of work.
    async fn begin(&self) -> Result<UnitOfWorkBox>;
    /// Committed accounts ordered by identifier.
    async fn list_accounts(&self) -> Result<Vec<Account>>;
    /// Committed transfer records ordered by identifier, oldest first.
    async fn list_transfers(&self) -> Result<Vec<TransferRecord>>;
}

/// An all-or-nothing sequence of reads and writes against a [`LedgerStore`].
///
/// Locks taken by a unit of work are held until it is committed or aborted.
/// Dropping it without calling [`UnitOfWork::commit`] aborts it, so every
/// exit path (including cancellation of the owning future) releases locks and
/// discards staged writes.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Acquires exclusive locks on both ids, in the order given, and returns
    /// whichever accounts exist in the same order.
    async fn lock_and_fetch(&mut self, ids: [&AccountId; 2]) -> Result<[Option<Account>; 2]>;
    /// Stages new balances for accounts locked by this unit of work.
    async fn apply_balances(&mut self, balances: &[(AccountId, Balance)]) -> Result<()>;
    /// Stages a new transfer record and returns its assigned identifier.
    async fn append_transfer(
        &mut self,
        source: &AccountId,
        destination: &AccountId,
        amount: Amount,
    ) -> Result<TransferId>;
    /// Makes every staged write visible and releases the locks.
    async fn commit(self: Box<Self>) -> Result<()>;
    /// Discards every staged write and releases the locks.
    async fn abort(self: Box<Self>) -> Result<()>;
}

/// Creation of accounts, which happens outside the transfer path.
#[async_trait]
pub trait AccountRegistry: Send + Sync {
    /// Creates `account` with its initial balance.
    ///
    /// Returns `Ok(false)` when an account with the same id already exists.
    async fn provision(&self, account: Account) -> Result<bool>;
}

pub type LedgerStoreBox = Box<dyn LedgerStore>;
pub type UnitOfWorkBox = Box<dyn UnitOfWork>;
