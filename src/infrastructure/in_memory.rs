use crate::domain::account::{Account, AccountId, Amount, Balance};
use crate::domain::ports::{AccountRegistry, LedgerStore, UnitOfWork, UnitOfWorkBox};
use crate::domain::transfer::{TransferId, TransferRecord};
use crate::error::{Result, WalletError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

type AccountCell = Arc<Mutex<Account>>;

/// A thread-safe in-memory ledger.
///
/// Every account sits behind its own async mutex, so units of work touching
/// disjoint accounts never contend. The map of accounts is only write-locked
/// while provisioning. `Clone` shares the underlying state.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    inner: Arc<Ledger>,
}

#[derive(Default)]
struct Ledger {
    accounts: RwLock<BTreeMap<AccountId, AccountCell>>,
    transfers: RwLock<BTreeMap<TransferId, TransferRecord>>,
    last_transfer_id: AtomicU64,
}

impl InMemoryLedger {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger already holding `accounts`.
    pub async fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Result<Self> {
        let ledger = Self::new();
        for account in accounts {
            let id = account.id.clone();
            if !ledger.provision(account).await? {
                return Err(WalletError::InvalidAccount(format!(
                    "duplicate account {id}"
                )));
            }
        }
        Ok(ledger)
    }

    async fn cell(&self, id: &AccountId) -> Option<AccountCell> {
        self.inner.accounts.read().await.get(id).cloned()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn begin(&self) -> Result<UnitOfWorkBox> {
        Ok(Box::new(InMemoryUnitOfWork {
            ledger: self.clone(),
            locked: Vec::with_capacity(2),
            staged_balances: HashMap::new(),
            staged_transfers: Vec::new(),
        }))
    }

    /// Waits for each account's lock in turn, so every entry is a committed
    /// state. The listing is consistent per account only: a transfer that
    /// commits while the listing runs may show up on one side and not the other.
    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let cells: Vec<AccountCell> = self.inner.accounts.read().await.values().cloned().collect();
        let mut accounts = Vec::with_capacity(cells.len());
        for cell in cells {
            accounts.push(cell.lock().await.clone());
        }
        Ok(accounts)
    }

    async fn list_transfers(&self) -> Result<Vec<TransferRecord>> {
        let transfers = self.inner.transfers.read().await;
        Ok(transfers.values().cloned().collect())
    }
}

#[async_trait]
impl AccountRegistry for InMemoryLedger {
    async fn provision(&self, account: Account) -> Result<bool> {
        account.validate()?;
        let mut accounts = self.inner.accounts.write().await;
        if accounts.contains_key(&account.id) {
            return Ok(false);
        }
        accounts.insert(account.id.clone(), Arc::new(Mutex::new(account)));
        Ok(true)
    }
}

/// Unit of work over [`InMemoryLedger`].
///
/// Holds owned guards on the accounts it locked. Writes are staged and only
/// copied into the guarded accounts on commit, so dropping the unit of work
/// at any point leaves the ledger untouched.
struct InMemoryUnitOfWork {
    ledger: InMemoryLedger,
    locked: Vec<OwnedMutexGuard<Account>>,
    staged_balances: HashMap<AccountId, Balance>,
    staged_transfers: Vec<TransferRecord>,
}

impl InMemoryUnitOfWork {
    fn held(&self, id: &AccountId) -> Option<Account> {
        self.locked.iter().find(|guard| guard.id == *id).map(|guard| {
            let mut account = (**guard).clone();
            if let Some(balance) = self.staged_balances.get(id) {
                account.balance = *balance;
            }
            account
        })
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn lock_and_fetch(&mut self, ids: [&AccountId; 2]) -> Result<[Option<Account>; 2]> {
        let mut fetched = [None, None];
        for (slot, id) in fetched.iter_mut().zip(ids) {
            // Re-locking an account this unit of work already holds would deadlock.
            if let Some(account) = self.held(id) {
                *slot = Some(account);
                continue;
            }
            if let Some(cell) = self.ledger.cell(id).await {
                let guard = cell.lock_owned().await;
                *slot = Some((*guard).clone());
                self.locked.push(guard);
            }
        }
        Ok(fetched)
    }

    async fn apply_balances(&mut self, balances: &[(AccountId, Balance)]) -> Result<()> {
        for (id, balance) in balances {
            if !self.locked.iter().any(|guard| guard.id == *id) {
                return Err(WalletError::StoreUnavailable(format!(
                    "account {id} is not locked by this unit of work"
                )));
            }
            self.staged_balances.insert(id.clone(), *balance);
        }
        Ok(())
    }

    async fn append_transfer(
        &mut self,
        source: &AccountId,
        destination: &AccountId,
        amount: Amount,
    ) -> Result<TransferId> {
        let id = TransferId(
            self.ledger
                .inner
                .last_transfer_id
                .fetch_add(1, Ordering::SeqCst)
                + 1,
        );
        self.staged_transfers.push(TransferRecord {
            id,
            source: source.clone(),
            destination: destination.clone(),
            amount,
        });
        Ok(id)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryUnitOfWork {
            ledger,
            mut locked,
            mut staged_balances,
            staged_transfers,
        } = *self;

        // Nothing below may await: the commit must not be cancellable halfway.
        let mut transfers = ledger.inner.transfers.write().await;
        for guard in locked.iter_mut() {
            if let Some(balance) = staged_balances.remove(&guard.id) {
                guard.balance = balance;
            }
        }
        for record in staged_transfers {
            transfers.insert(record.id, record);
        }
        drop(transfers);
        drop(locked);
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
