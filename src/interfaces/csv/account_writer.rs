use crate::domain::account::Account;
use crate::error::Result;
use std::io::Write;

/// Writes account states as CSV (`id,balance,currency`).
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Serializes every account, in the order given, then flushes.
    pub fn write_accounts(&mut self, accounts: impl IntoIterator<Item = Account>) -> Result<()> {
        for account in accounts {
            self.writer.serialize(account)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_write_accounts() {
        let mut buffer = Vec::new();
        AccountWriter::new(&mut buffer)
            .write_accounts([
                Account::new("alice456", dec!(10.01), "USD"),
                Account::new("bob123", dec!(90), "USD"),
            ])
            .unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(output, "id,balance,currency\nalice456,10.01,USD\nbob123,90,USD\n");
    }
}
