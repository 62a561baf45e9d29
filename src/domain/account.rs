use crate::error::WalletError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque account identifier.
///
/// Ordering is lexicographic over the string and defines the canonical lock order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Short currency code such as `USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Exact signed decimal balance of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balance(#[serde(with = "rust_decimal::serde::str")] pub Decimal);

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Adds `amount`, failing if the sum overflows or cannot be held exactly.
    pub fn credit(self, amount: Amount) -> Result<Self, WalletError> {
        exact(self.0, amount.0, self.0.checked_add(amount.0)).map(Self)
    }

    /// Subtracts `amount` under the same exactness rule as [`Balance::credit`].
    pub fn debit(self, amount: Amount) -> Result<Self, WalletError> {
        exact(self.0, amount.0, self.0.checked_sub(amount.0)).map(Self)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// rust_decimal keeps the larger operand scale unless it has to round, so a
// smaller result scale means digits were dropped. A zero operand cannot round.
fn exact(lhs: Decimal, rhs: Decimal, result: Option<Decimal>) -> Result<Decimal, WalletError> {
    match result {
        Some(value)
            if lhs.is_zero()
                || rhs.is_zero()
                || value.scale() >= lhs.scale().max(rhs.scale()) =>
        {
            Ok(value)
        }
        _ => Err(WalletError::InexactArithmetic),
    }
}

/// Strictly positive amount moved by a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, WalletError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(WalletError::InvalidAmount)
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = WalletError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An account in the shared ledger.
///
/// Accounts are provisioned externally; afterwards only the transfer
/// coordinator changes `balance`, and `currency` never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub balance: Balance,
    pub currency: Currency,
}

impl Account {
    pub fn new(id: impl Into<AccountId>, balance: Decimal, currency: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            balance: Balance::new(balance),
            currency: Currency::new(currency),
        }
    }

    /// Checks the invariants an account must satisfy when it is provisioned.
    pub fn validate(&self) -> Result<(), WalletError> {
        if self.id.is_empty() {
            return Err(WalletError::InvalidAccount("empty account id".to_string()));
        }
        if self.currency.as_str().is_empty() {
            return Err(WalletError::InvalidAccount(format!(
                "account {} has no currency",
                self.id
            )));
        }
        if self.balance.is_negative() {
            return Err(WalletError::InvalidAccount(format!(
                "account {} has a negative balance",
                self.id
            )));
        }
        Ok(())
    }
}
