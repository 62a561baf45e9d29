//! JSON request and response bodies.

use crate::domain::account::{Account, AccountId, Amount};
use crate::domain::transfer::TransferRecord;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ListAccountsResponse {
    pub accounts: Vec<Account>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// One side of a committed transfer, seen from `account`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentEntry {
    pub account: AccountId,
    pub amount: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_account: Option<AccountId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_account: Option<AccountId>,
    pub direction: Direction,
}

#[derive(Debug, Serialize)]
pub struct ListPaymentsResponse {
    pub payments: Vec<PaymentEntry>,
}

impl ListPaymentsResponse {
    /// Expands every transfer into an outgoing entry for the source followed
    /// by an incoming entry for the destination.
    pub fn from_transfers(transfers: Vec<TransferRecord>) -> Self {
        let mut payments = Vec::with_capacity(transfers.len() * 2);
        for transfer in transfers {
            payments.push(PaymentEntry {
                account: transfer.source.clone(),
                amount: transfer.amount,
                to_account: Some(transfer.destination.clone()),
                from_account: None,
                direction: Direction::Outgoing,
            });
            payments.push(PaymentEntry {
                account: transfer.destination,
                amount: transfer.amount,
                to_account: None,
                from_account: Some(transfer.source),
                direction: Direction::Incoming,
            });
        }
        Self { payments }
    }
}

/// Body of `POST /payments`. Absent fields take their zero value.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SendPaymentRequest {
    #[serde(rename = "FromAccountId")]
    pub from_account_id: AccountId,
    #[serde(rename = "ToAccountId")]
    pub to_account_id: AccountId,
    #[serde(rename = "Amount", with = "rust_decimal::serde::str")]
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct SendPaymentResponse {
    pub status: &'static str,
}

impl SendPaymentResponse {
    pub fn sent() -> Self {
        Self {
            status: "Payment successfully sent",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
