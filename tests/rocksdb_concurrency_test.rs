#![cfg(feature = "storage-rocksdb")]

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use wallet::application::coordinator::TransferCoordinator;
use wallet::application::service::WalletService;
use wallet::domain::account::{Account, Balance};
use wallet::domain::ports::AccountRegistry;
use wallet::infrastructure::rocksdb::RocksDbLedger;

mod common;
use common::{balance_of, id, total_balance};

const WAIT: Duration = Duration::from_secs(30);

async fn open_with(path: &Path, accounts: [Account; 2]) -> RocksDbLedger {
    let ledger = RocksDbLedger::open_with_lock_timeout(path, WAIT).unwrap();
    for account in accounts {
        assert!(ledger.provision(account).await.unwrap());
    }
    ledger
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rocksdb_concurrent_transfers_lose_no_updates() {
    const N: usize = 50;
    let dir = tempdir().unwrap();
    let amount = dec!(0.25);
    let ledger = open_with(
        dir.path(),
        [
            Account::new("x", amount * Decimal::from(N), "USD"),
            Account::new("y", dec!(3), "USD"),
        ],
    )
    .await;
    let coordinator =
        Arc::new(TransferCoordinator::new(Box::new(ledger.clone())).with_timeout(WAIT));

    let mut handles = Vec::with_capacity(N);
    for _ in 0..N {
        let coordinator = Arc::clone(&coordinator);
        handles.push(tokio::spawn(async move {
            coordinator.transfer(&id("x"), &id("y"), amount).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().expect("every transfer should succeed");
    }

    assert_eq!(balance_of(&ledger, "x").await, Balance::ZERO);
    assert_eq!(
        balance_of(&ledger, "y").await,
        Balance::new(dec!(3) + amount * Decimal::from(N))
    );
    assert_eq!(coordinator.list_transfers().await.unwrap().len(), N);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rocksdb_opposing_transfers_do_not_deadlock() {
    let dir = tempdir().unwrap();
    let ledger = open_with(
        dir.path(),
        [
            Account::new("alpha", dec!(1000), "EUR"),
            Account::new("omega", dec!(1000), "EUR"),
        ],
    )
    .await;
    let total_before = total_balance(&ledger).await;
    let coordinator =
        Arc::new(TransferCoordinator::new(Box::new(ledger.clone())).with_timeout(WAIT));

    let mut handles = Vec::new();
    for i in 0..40 {
        let coordinator = Arc::clone(&coordinator);
        let (from, to) = if i % 2 == 0 {
            ("alpha", "omega")
        } else {
            ("omega", "alpha")
        };
        handles.push(tokio::spawn(async move {
            coordinator.transfer(&id(from), &id(to), dec!(1)).await
        }));
    }

    let all = async {
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    };
    tokio::time::timeout(WAIT, all)
        .await
        .expect("opposing transfers deadlocked");

    assert_eq!(balance_of(&ledger, "alpha").await, Balance::new(dec!(1000)));
    assert_eq!(balance_of(&ledger, "omega").await, Balance::new(dec!(1000)));
    assert_eq!(total_balance(&ledger).await, total_before);
    assert_eq!(coordinator.list_transfers().await.unwrap().len(), 40);
}
