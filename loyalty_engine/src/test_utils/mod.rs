//! Helpers for tests: temporary SQLite databases, an in-memory ledger and a scripted accrual source.
pub mod accrual_stub;
pub mod memory_ledger;
pub mod prepare_env;

use crate::{db_types::OrderNumber, helpers::luhn};

/// A Luhn-valid order number built from `seed` plus a check digit.
pub fn order_number(seed: u64) -> OrderNumber {
    let digits = luhn::with_check_digit(&seed.to_string()).expect("A u64 is always numeric");
    OrderNumber::parse(&digits).expect("Check digit was just calculated")
}
