use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::sync::Arc;
use wallet::application::coordinator::TransferCoordinator;
use wallet::application::logging::LoggingWallet;
use wallet::application::service::{SharedWalletService, WalletService};
use wallet::config::{Command, Config, StoreConfig};
use wallet::domain::account::AccountId;
use wallet::domain::ports::{AccountRegistry, LedgerStoreBox};
use wallet::infrastructure::in_memory::InMemoryLedger;
use wallet::interfaces::csv::account_reader::{AccountReader, provision_accounts};
use wallet::interfaces::csv::account_writer::AccountWriter;
use wallet::interfaces::http;
use wallet::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_logging(config.log_format);

    let (store, registry) = open_store(&config.store)?;
    if let Some(path) = &config.store.accounts {
        let file = File::open(path).into_diagnostic()?;
        let created = provision_accounts(registry.as_ref(), AccountReader::new(file))
            .await
            .into_diagnostic()?;
        tracing::info!(created, path = %path.display(), "accounts provisioned");
    }

    let wallet = LoggingWallet::new(
        TransferCoordinator::new(store).with_timeout(config.store.lock_timeout()),
    );

    match config.command {
        Command::Serve { addr } => {
            let wallet: SharedWalletService = Arc::new(wallet);
            http::serve(wallet, addr).await.into_diagnostic()?;
        }
        Command::Balances => print_balances(&wallet).await?,
        Command::Transfer { from, to, amount } => {
            wallet
                .transfer(&AccountId::from(from), &AccountId::from(to), amount)
                .await
                .into_diagnostic()?;
            print_balances(&wallet).await?;
        }
    }

    Ok(())
}

fn open_store(config: &StoreConfig) -> Result<(LedgerStoreBox, Box<dyn AccountRegistry>)> {
    if let Some(db_path) = &config.db_path {
        #[cfg(feature = "storage-rocksdb")]
        {
            let ledger = wallet::infrastructure::rocksdb::RocksDbLedger::open_with_lock_timeout(
                db_path,
                config.lock_timeout(),
            )
            .into_diagnostic()?;
            return Ok((Box::new(ledger.clone()), Box::new(ledger)));
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        tracing::warn!(
            db_path = %db_path.display(),
            "persistent storage requested via --db-path, but the 'storage-rocksdb' feature is not enabled; falling back to in-memory storage"
        );
    }

    let ledger = InMemoryLedger::new();
    Ok((Box::new(ledger.clone()), Box::new(ledger)))
}

async fn print_balances(wallet: &impl WalletService) -> Result<()> {
    let accounts = wallet.list_accounts().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = AccountWriter::new(stdout.lock());
    writer.write_accounts(accounts).into_diagnostic()?;
    Ok(())
}
