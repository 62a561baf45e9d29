use crate::domain::account::{Account, AccountId, Amount, Balance};
use crate::domain::ports::{AccountRegistry, LedgerStore, UnitOfWork, UnitOfWorkBox};
use crate::domain::transfer::{TransferId, TransferRecord};
use crate::error::{Result, WalletError};
use async_trait::async_trait;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, Transaction, TransactionDB,
    TransactionDBOptions, TransactionOptions, WriteOptions,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Column Family for storing account states.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family for storing committed transfer records.
pub const CF_TRANSFERS: &str = "transfers";

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// A persistent ledger backed by a pessimistic RocksDB `TransactionDB`.
///
/// Accounts are keyed by their id bytes, so iteration yields them in
/// identifier order. Transfer records are keyed by the big-endian id.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<TransactionDB>`).
#[derive(Clone)]
pub struct RocksDbLedger {
    db: Arc<TransactionDB>,
    last_transfer_id: Arc<AtomicU64>,
    lock_timeout: Duration,
}

impl RocksDbLedger {
    /// Opens or creates a ledger at `path` with the default lock timeout.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_lock_timeout(path, DEFAULT_LOCK_TIMEOUT)
    }

    /// Opens or creates a ledger at `path`.
    ///
    /// Ensures that the required column families exist and resumes the
    /// transfer id sequence after the highest persisted record.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    /// * `lock_timeout` - How long a unit of work waits for an account lock.
    pub fn open_with_lock_timeout<P: AsRef<Path>>(path: P, lock_timeout: Duration) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let mut txn_db_opts = TransactionDBOptions::default();
        txn_db_opts.set_txn_lock_timeout(millis(lock_timeout));

        let cf_accounts = ColumnFamilyDescriptor::new(CF_ACCOUNTS, Options::default());
        let cf_transfers = ColumnFamilyDescriptor::new(CF_TRANSFERS, Options::default());

        let db: TransactionDB = TransactionDB::open_cf_descriptors(
            &opts,
            &txn_db_opts,
            path,
            vec![cf_accounts, cf_transfers],
        )?;
        let last_transfer_id = last_transfer_id(&db)?;

        Ok(Self {
            db: Arc::new(db),
            last_transfer_id: Arc::new(AtomicU64::new(last_transfer_id)),
            lock_timeout,
        })
    }
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

fn column<'a>(db: &'a TransactionDB, name: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(name)
        .ok_or_else(|| WalletError::StoreUnavailable(format!("{name} column family not found")))
}

fn last_transfer_id(db: &TransactionDB) -> Result<u64> {
    let cf = column(db, CF_TRANSFERS)?;
    match db.iterator_cf(cf, IteratorMode::End).next() {
        Some(item) => {
            let (key, _value) = item?;
            let bytes: [u8; 8] = key.as_ref().try_into().map_err(|_| {
                WalletError::StoreUnavailable("malformed transfer key".to_string())
            })?;
            Ok(u64::from_be_bytes(bytes))
        }
        None => Ok(0),
    }
}

#[async_trait]
impl LedgerStore for RocksDbLedger {
    async fn begin(&self) -> Result<UnitOfWorkBox> {
        let (commands, receiver) = mpsc::channel(1);
        let db = Arc::clone(&self.db);
        let lock_timeout = self.lock_timeout;
        tokio::task::spawn_blocking(move || run_unit_of_work(db, lock_timeout, receiver));
        Ok(Box::new(RocksDbUnitOfWork {
            commands,
            last_transfer_id: Arc::clone(&self.last_transfer_id),
        }))
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let cf = column(&self.db, CF_ACCOUNTS)?;
        let mut accounts = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            accounts.push(serde_json::from_slice(&value)?);
        }
        Ok(accounts)
    }

    async fn list_transfers(&self) -> Result<Vec<TransferRecord>> {
        let cf = column(&self.db, CF_TRANSFERS)?;
        let mut transfers = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            transfers.push(serde_json::from_slice(&value)?);
        }
        Ok(transfers)
    }
}

#[async_trait]
impl AccountRegistry for RocksDbLedger {
    async fn provision(&self, account: Account) -> Result<bool> {
        account.validate()?;
        let cf = column(&self.db, CF_ACCOUNTS)?;
        let txn = self.db.transaction();
        let key = account.id.as_str().as_bytes();
        if txn.get_for_update_cf(cf, key, true)?.is_some() {
            txn.rollback()?;
            return Ok(false);
        }
        txn.put_cf(cf, key, serde_json::to_vec(&account)?)?;
        txn.commit()?;
        Ok(true)
    }
}

enum Command {
    LockAndFetch {
        ids: [AccountId; 2],
        reply: oneshot::Sender<Result<[Option<Account>; 2]>>,
    },
    ApplyBalances {
        balances: Vec<(AccountId, Balance)>,
        reply: oneshot::Sender<Result<()>>,
    },
    AppendTransfer {
        record: TransferRecord,
        reply: oneshot::Sender<Result<()>>,
    },
    Commit {
        reply: oneshot::Sender<Result<()>>,
    },
    Abort {
        reply: oneshot::Sender<Result<()>>,
    },
}

/// Owns one RocksDB transaction for the lifetime of a unit of work.
///
/// Runs on the blocking pool because lock waits block the thread. When the
/// command channel closes without a commit, the transaction is rolled back.
fn run_unit_of_work(
    db: Arc<TransactionDB>,
    lock_timeout: Duration,
    commands: mpsc::Receiver<Command>,
) {
    let finished = {
        let mut txn_opts = TransactionOptions::default();
        txn_opts.set_lock_timeout(millis(lock_timeout));
        let txn = db.transaction_opt(&WriteOptions::default(), &txn_opts);
        drive(&db, txn, commands)
    };
    // The database handle is released before the final reply so a ledger
    // dropped right after commit can be reopened.
    drop(db);
    if let Some((reply, outcome)) = finished {
        let _ = reply.send(outcome);
    }
}

type Finished = (oneshot::Sender<Result<()>>, Result<()>);

fn drive(
    db: &TransactionDB,
    txn: Transaction<'_, TransactionDB>,
    mut commands: mpsc::Receiver<Command>,
) -> Option<Finished> {
    let mut locked = HashSet::new();

    while let Some(command) = commands.blocking_recv() {
        match command {
            Command::LockAndFetch { ids, reply } => {
                let _ = reply.send(lock_and_fetch(db, &txn, &ids, &mut locked));
            }
            Command::ApplyBalances { balances, reply } => {
                let _ = reply.send(apply_balances(db, &txn, &balances, &locked));
            }
            Command::AppendTransfer { record, reply } => {
                let _ = reply.send(append_transfer(db, &txn, &record));
            }
            Command::Commit { reply } => {
                return Some((reply, txn.commit().map_err(WalletError::from)));
            }
            Command::Abort { reply } => {
                return Some((reply, txn.rollback().map_err(WalletError::from)));
            }
        }
    }

    if let Err(e) = txn.rollback() {
        tracing::warn!(error = %e, "rollback of abandoned unit of work failed");
    }
    None
}

fn lock_and_fetch(
    db: &TransactionDB,
    txn: &Transaction<'_, TransactionDB>,
    ids: &[AccountId; 2],
    locked: &mut HashSet<AccountId>,
) -> Result<[Option<Account>; 2]> {
    let cf = column(db, CF_ACCOUNTS)?;
    let mut fetched = [None, None];
    for (slot, id) in fetched.iter_mut().zip(ids) {
        let value = txn.get_for_update_cf(cf, id.as_str().as_bytes(), true)?;
        locked.insert(id.clone());
        if let Some(bytes) = value {
            *slot = Some(serde_json::from_slice(&bytes)?);
        }
    }
    Ok(fetched)
}

fn apply_balances(
    db: &TransactionDB,
    txn: &Transaction<'_, TransactionDB>,
    balances: &[(AccountId, Balance)],
    locked: &HashSet<AccountId>,
) -> Result<()> {
    let cf = column(db, CF_ACCOUNTS)?;
    for (id, balance) in balances {
        if !locked.contains(id) {
            return Err(WalletError::StoreUnavailable(format!(
                "account {id} is not locked by this unit of work"
            )));
        }
        let key = id.as_str().as_bytes();
        let bytes = txn.get_for_update_cf(cf, key, true)?.ok_or_else(|| {
            WalletError::StoreUnavailable(format!("account {id} vanished while locked"))
        })?;
        let mut account: Account = serde_json::from_slice(&bytes)?;
        account.balance = *balance;
        txn.put_cf(cf, key, serde_json::to_vec(&account)?)?;
    }
    Ok(())
}

fn append_transfer(
    db: &TransactionDB,
    txn: &Transaction<'_, TransactionDB>,
    record: &TransferRecord,
) -> Result<()> {
    let cf = column(db, CF_TRANSFERS)?;
    txn.put_cf(cf, record.id.0.to_be_bytes(), serde_json::to_vec(record)?)?;
    Ok(())
}

/// Async handle to a unit of work whose transaction lives on a blocking worker.
struct RocksDbUnitOfWork {
    commands: mpsc::Sender<Command>,
    last_transfer_id: Arc<AtomicU64>,
}

impl RocksDbUnitOfWork {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> Command + Send,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| WalletError::StoreUnavailable("unit of work worker stopped".to_string()))?;
        response.await.map_err(|_| {
            WalletError::StoreUnavailable("unit of work worker dropped the reply".to_string())
        })?
    }
}

#[async_trait]
impl UnitOfWork for RocksDbUnitOfWork {
    async fn lock_and_fetch(&mut self, ids: [&AccountId; 2]) -> Result<[Option<Account>; 2]> {
        let ids = [ids[0].clone(), ids[1].clone()];
        self.request(|reply| Command::LockAndFetch { ids, reply })
            .await
    }

    async fn apply_balances(&mut self, balances: &[(AccountId, Balance)]) -> Result<()> {
        let balances = balances.to_vec();
        self.request(|reply| Command::ApplyBalances { balances, reply })
            .await
    }

    async fn append_transfer(
        &mut self,
        source: &AccountId,
        destination: &AccountId,
        amount: Amount,
    ) -> Result<TransferId> {
        let id = TransferId(self.last_transfer_id.fetch_add(1, Ordering::SeqCst) + 1);
        let record = TransferRecord {
            id,
            source: source.clone(),
            destination: destination.clone(),
            amount,
        };
        self.request(|reply| Command::AppendTransfer { record, reply })
            .await?;
        Ok(id)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.request(|reply| Command::Commit { reply }).await
    }

    async fn abort(self: Box<Self>) -> Result<()> {
        self.request(|reply| Command::Abort { reply }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    async fn seeded(path: &Path) -> RocksDbLedger {
        let ledger = RocksDbLedger::open_with_lock_timeout(path, Duration::from_millis(200)).unwrap();
        ledger
            .provision(Account::new("bob123", dec!(100), "USD"))
            .await
            .unwrap();
        ledger
            .provision(Account::new("alice456", dec!(0.01), "USD"))
            .await
            .unwrap();
        ledger
    }

    async fn move_ten(ledger: &RocksDbLedger) -> UnitOfWorkBox {
        let bob = AccountId::from("bob123");
        let alice = AccountId::from("alice456");
        let mut uow = ledger.begin().await.unwrap();
        uow.lock_and_fetch([&alice, &bob]).await.unwrap();
        uow.apply_balances(&[
            (bob.clone(), Balance::new(dec!(90))),
            (alice.clone(), Balance::new(dec!(10.01))),
        ])
        .await
        .unwrap();
        uow.append_transfer(&bob, &alice, Amount::new(dec!(10)).unwrap())
            .await
            .unwrap();
        uow
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let ledger = RocksDbLedger::open(dir.path()).expect("Failed to open RocksDB");

        assert!(ledger.db.cf_handle(CF_ACCOUNTS).is_some());
        assert!(ledger.db.cf_handle(CF_TRANSFERS).is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_provision_is_idempotent() {
        let dir = tempdir().unwrap();
        let ledger = seeded(dir.path()).await;

        let created = ledger
            .provision(Account::new("bob123", dec!(1), "USD"))
            .await
            .unwrap();
        assert!(!created);

        let accounts = ledger.list_accounts().await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].id, AccountId::from("alice456"));
        assert_eq!(accounts[1].balance, Balance::new(dec!(100)));
    }

    #[tokio::test]
    async fn test_rocksdb_commit_and_abort() {
        let dir = tempdir().unwrap();
        let ledger = seeded(dir.path()).await;

        move_ten(&ledger).await.abort().await.unwrap();
        assert!(ledger.list_transfers().await.unwrap().is_empty());
        let accounts = ledger.list_accounts().await.unwrap();
        assert_eq!(accounts[1].balance, Balance::new(dec!(100)));

        move_ten(&ledger).await.commit().await.unwrap();
        let transfers = ledger.list_transfers().await.unwrap();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].amount.value(), dec!(10));
        let accounts = ledger.list_accounts().await.unwrap();
        assert_eq!(accounts[0].balance, Balance::new(dec!(10.01)));
        assert_eq!(accounts[1].balance, Balance::new(dec!(90)));
    }

    #[tokio::test]
    async fn test_rocksdb_dropped_unit_of_work_releases_locks() {
        let dir = tempdir().unwrap();
        let ledger = seeded(dir.path()).await;

        drop(move_ten(&ledger).await);

        // The locks must be free again for the next unit of work.
        move_ten(&ledger).await.commit().await.unwrap();
        let transfers = ledger.list_transfers().await.unwrap();
        assert_eq!(transfers.len(), 1);
    }

    #[tokio::test]
    async fn test_rocksdb_lock_wait_times_out() {
        let dir = tempdir().unwrap();
        let ledger = seeded(dir.path()).await;
        let bob = AccountId::from("bob123");

        let mut holder = ledger.begin().await.unwrap();
        holder.lock_and_fetch([&bob, &bob]).await.unwrap();

        let mut contender = ledger.begin().await.unwrap();
        let result = contender.lock_and_fetch([&bob, &bob]).await;
        assert!(matches!(result, Err(WalletError::Storage(_))));

        holder.abort().await.unwrap();
    }

    #[tokio::test]
    async fn test_rocksdb_transfer_ids_resume_after_reopen() {
        let dir = tempdir().unwrap();
        let first_id = {
            let ledger = seeded(dir.path()).await;
            move_ten(&ledger).await.commit().await.unwrap();
            ledger.list_transfers().await.unwrap()[0].id
        };

        let ledger = RocksDbLedger::open(dir.path()).unwrap();
        move_ten(&ledger).await.commit().await.unwrap();

        let transfers = ledger.list_transfers().await.unwrap();
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].id, first_id);
        assert!(transfers[1].id > first_id);
    }
}
