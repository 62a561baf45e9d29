use super::service::WalletService;
use crate::domain::account::{Account, AccountId, Amount};
use crate::domain::ports::{LedgerStoreBox, UnitOfWork};
use crate::domain::transfer::{TransferId, TransferRecord};
use crate::error::{Result, WalletError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;

pub const DEFAULT_UNIT_OF_WORK_TIMEOUT: Duration = Duration::from_secs(5);

/// Executes transfers as single units of work against a ledger store.
///
/// Accounts are always locked in ascending identifier order, so two transfers
/// sharing an account can never wait on each other in a cycle. Transfers on
/// disjoint accounts do not contend at all.
pub struct TransferCoordinator {
    store: LedgerStoreBox,
    timeout: Duration,
}

impl TransferCoordinator {
    /// Creates a new `TransferCoordinator`.
    ///
    /// # Arguments
    ///
    /// * `store` - The ledger holding accounts and transfer records.
    pub fn new(store: LedgerStoreBox) -> Self {
        Self {
            store,
            timeout: DEFAULT_UNIT_OF_WORK_TIMEOUT,
        }
    }

    /// Bounds how long lock acquisition and staging may take before the unit
    /// of work is aborted.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn settle(
        &self,
        source: &AccountId,
        destination: &AccountId,
        amount: Amount,
    ) -> Result<TransferId> {
        let mut uow = self.store.begin().await?;
        let staged = tokio::time::timeout(
            self.timeout,
            stage(uow.as_mut(), source, destination, amount),
        )
        .await
        .unwrap_or_else(|_elapsed| Err(WalletError::Timeout(self.timeout)));

        match staged {
            Ok(id) => {
                uow.commit().await?;
                Ok(id)
            }
            Err(e) => {
                if let Err(abort_err) = uow.abort().await {
                    tracing::error!(error = %abort_err, "failed to abort unit of work");
                }
                Err(e)
            }
        }
    }
}

/// Rejects a request before any lock is taken. The first failing check wins.
fn validate(source: &AccountId, destination: &AccountId, amount: Decimal) -> Result<Amount> {
    if source.is_empty() || destination.is_empty() {
        return Err(WalletError::AccountsNotSpecified);
    }
    if source == destination {
        return Err(WalletError::SameAccount);
    }
    Amount::new(amount)
}

fn lock_order<'a>(a: &'a AccountId, b: &'a AccountId) -> [&'a AccountId; 2] {
    if a <= b { [a, b] } else { [b, a] }
}

async fn stage(
    uow: &mut dyn UnitOfWork,
    source: &AccountId,
    destination: &AccountId,
    amount: Amount,
) -> Result<TransferId> {
    let order = lock_order(source, destination);
    let [first, second] = uow.lock_and_fetch(order).await?;
    let (from, to) = if order[0] == source {
        (first, second)
    } else {
        (second, first)
    };
    let (Some(from), Some(to)) = (from, to) else {
        return Err(WalletError::AccountNotFound);
    };
    if from.currency != to.currency {
        return Err(WalletError::CurrencyMismatch);
    }
    if from.balance.value() < amount.value() {
        return Err(WalletError::InsufficientBalance);
    }
    let new_source_balance = from.balance.debit(amount)?;
    let new_destination_balance = to.balance.credit(amount)?;

    uow.apply_balances(&[
        (source.clone(), new_source_balance),
        (destination.clone(), new_destination_balance),
    ])
    .await?;
    uow.append_transfer(source, destination, amount).await
}

#[async_trait]
impl WalletService for TransferCoordinator {
    async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.store.list_accounts().await
    }

    async fn list_transfers(&self) -> Result<Vec<TransferRecord>> {
        self.store.list_transfers().await
    }

    async fn transfer(
        &self,
        source: &AccountId,
        destination: &AccountId,
        amount: Decimal,
    ) -> Result<TransferId> {
        let amount = validate(source, destination, amount)?;
        self.settle(source, destination, amount).await
    }
}
