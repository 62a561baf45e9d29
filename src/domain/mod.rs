//! Domain layer: ledger value types and the ports the application drives.

pub mod account;
pub mod ports;
pub mod transfer;
