//! Adapters between the outside world and the wallet service.

pub mod csv;
pub mod http;
