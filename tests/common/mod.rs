#![allow(dead_code)]

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::io::Write;
use tempfile::NamedTempFile;
use wallet::domain::account::{Account, AccountId, Balance};
use wallet::domain::ports::LedgerStore;
use wallet::infrastructure::in_memory::InMemoryLedger;

pub const SEED_CSV: &str = "id,balance,currency\nbob123,100,USD\nalice456,0.01,USD\neve789,1000,RUB\n";

/// The three accounts every scenario starts from.
pub async fn seeded_ledger() -> InMemoryLedger {
    InMemoryLedger::with_accounts([
        Account::new("bob123", dec!(100), "USD"),
        Account::new("alice456", dec!(0.01), "USD"),
        Account::new("eve789", dec!(1000), "RUB"),
    ])
    .await
    .unwrap()
}

pub fn id(s: &str) -> AccountId {
    AccountId::from(s)
}

pub async fn balance_of(store: &dyn LedgerStore, account: &str) -> Balance {
    store
        .list_accounts()
        .await
        .unwrap()
        .into_iter()
        .find(|a| a.id.as_str() == account)
        .unwrap_or_else(|| panic!("account {account} not found"))
        .balance
}

pub async fn total_balance(store: &dyn LedgerStore) -> Decimal {
    store
        .list_accounts()
        .await
        .unwrap()
        .iter()
        .map(|a| a.balance.value())
        .sum()
}

pub fn seed_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(SEED_CSV.as_bytes()).unwrap();
    file
}
