//! Application layer containing the transfer orchestration.
//!
//! [`service::WalletService`] is the interface transports call. The
//! [`coordinator::TransferCoordinator`] implements it against a ledger store,
//! and [`logging::LoggingWallet`] decorates any implementation with
//! structured logs.

pub mod coordinator;
pub mod logging;
pub mod service;
