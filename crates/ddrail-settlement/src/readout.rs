//! Bank statement readout parsing.
//!
//! A readout is plain text, one transfer per line:
//!
//! ```text
//! # Date,Description,Amount,Account,Transaction ID
//! 2024-03-01, Transfer to GB29NWBK60161331926819, 100.00, GB33BUKB20201555555555, tx-1
//! ```
//!
//! Everything after a `#` is commentary. Lines that do not have exactly five
//! comma-separated cells, or whose amount is not a decimal number, are
//! skipped.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One transfer seen on the bank side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankStatementRecord {
    pub date: String,
    pub description: String,
    pub amount: Decimal,
    pub account: String,
    pub transaction_id: String,
}

/// Parse every well-formed line of `body`.
#[must_use]
pub fn parse_statement(body: &str) -> Vec<BankStatementRecord> {
    body.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<BankStatementRecord> {
    let line = line.split('#').next().unwrap_or(line);
    let cells: Vec<&str> = line.split(',').map(str::trim).collect();
    let [date, description, amount, account, transaction_id] = cells.as_slice() else {
        return None;
    };
    let Ok(amount) = Decimal::from_str(amount) else {
        tracing::debug!(line, "skipping readout line with unparsable amount");
        return None;
    };
    Some(BankStatementRecord {
        date: (*date).to_string(),
        description: (*description).to_string(),
        amount,
        account: (*account).to_string(),
        transaction_id: (*transaction_id).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_records_and_skips_comments() {
        let body = "\
# Date,Description,Amount,Account,Transaction ID
2024-03-01, Transfer to BANK-B, 100.50, BANK-A, tx-1 # first
2024-03-02,Transfer to BANK-A,7,BANK-B,tx-2
";
        let records = parse_statement(body);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].description, "Transfer to BANK-B");
        assert_eq!(records[0].amount, Decimal::new(10050, 2));
        assert_eq!(records[0].transaction_id, "tx-1");
        assert_eq!(records[1].account, "BANK-B");
    }

    #[test]
    fn skips_wrong_cell_count() {
        let body = "a,b,1,c\na,b,1,c,d,e\n\n";
        assert!(parse_statement(body).is_empty());
    }

    #[test]
    fn skips_bad_amount_without_panicking() {
        let body = "2024-03-01,desc,lots,acc,tx\n2024-03-01,desc,2,acc,tx";
        let records = parse_statement(body);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, Decimal::from(2));
    }

    #[test]
    fn empty_body() {
        assert!(parse_statement("").is_empty());
    }
}
