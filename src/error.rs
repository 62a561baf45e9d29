use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WalletError>;

/// Closed classification of every failure the wallet can surface.
///
/// Transports switch on this rather than on error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AccountsNotSpecified,
    SameAccount,
    InvalidAmount,
    AccountNotFound,
    CurrencyMismatch,
    InsufficientBalance,
    MalformedRequest,
    /// Any unit-of-work or storage failure without a business meaning.
    StoreUnavailable,
}

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("two accounts must be specified")]
    AccountsNotSpecified,
    #[error("cannot send a payment to the same account")]
    SameAccount,
    #[error("invalid amount")]
    InvalidAmount,
    #[error("account(s) not found")]
    AccountNotFound,
    #[error("accounts have different currencies")]
    CurrencyMismatch,
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("unable to parse request")]
    MalformedRequest,
    #[error("unit of work timed out after {0:?}")]
    Timeout(Duration),
    #[error("balance arithmetic overflowed or lost precision")]
    InexactArithmetic,
    #[error("ledger store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("invalid account: {0}")]
    InvalidAccount(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    Storage(#[from] rocksdb::Error),
}

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AccountsNotSpecified => ErrorKind::AccountsNotSpecified,
            Self::SameAccount => ErrorKind::SameAccount,
            Self::InvalidAmount => ErrorKind::InvalidAmount,
            Self::AccountNotFound => ErrorKind::AccountNotFound,
            Self::CurrencyMismatch => ErrorKind::CurrencyMismatch,
            Self::InsufficientBalance => ErrorKind::InsufficientBalance,
            Self::MalformedRequest => ErrorKind::MalformedRequest,
            Self::Timeout(_)
            | Self::InexactArithmetic
            | Self::StoreUnavailable(_)
            | Self::InvalidAccount(_)
            | Self::Io(_)
            | Self::Csv(_)
            | Self::Serialization(_) => ErrorKind::StoreUnavailable,
            #[cfg(feature = "storage-rocksdb")]
            Self::Storage(_) => ErrorKind::StoreUnavailable,
        }
    }

    /// True for failures caused by the request itself rather than the system.
    pub fn is_business(&self) -> bool {
        self.kind() != ErrorKind::StoreUnavailable
    }
}
