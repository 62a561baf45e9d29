use crate::domain::account::Account;
use crate::domain::ports::AccountRegistry;
use crate::error::{Result, WalletError};
use std::io::Read;

/// Reads accounts to provision from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<Account>`.
/// It trims whitespace around fields automatically.
pub struct AccountReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> AccountReader<R> {
    /// Creates a new `AccountReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes accounts.
    pub fn accounts(self) -> impl Iterator<Item = Result<Account>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(WalletError::from))
    }
}

/// Provisions every account read from `reader` into `registry`.
///
/// Accounts that already exist are skipped. Returns how many were created.
pub async fn provision_accounts<R: Read>(
    registry: &dyn AccountRegistry,
    reader: AccountReader<R>,
) -> Result<usize> {
    let mut created = 0;
    for account in reader.accounts() {
        let account = account?;
        let id = account.id.clone();
        if registry.provision(account).await? {
            created += 1;
        } else {
            tracing::info!(account = %id, "account already provisioned, skipping");
        }
    }
    Ok(created)
}
