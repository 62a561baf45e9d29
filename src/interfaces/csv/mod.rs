//! CSV seeding and dumping of accounts (`id,balance,currency`).

pub mod account_reader;
pub mod account_writer;
