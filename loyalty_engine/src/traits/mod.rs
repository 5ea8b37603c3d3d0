//! # Ledger store and accrual source contracts
//!
//! This module defines the behaviour that storage backends and accrual providers need to expose to be used by the
//! loyalty engine.
//!
//! * [`LedgerStore`] owns every mutation of balances, withdrawal totals and order statuses.
//! * [`AccountManagement`] provides read-only queries over users, orders and withdrawals.
//! * [`AccrualSource`] reports what the external accrual service knows about an order.
mod account_management;
mod accrual_source;
mod data_objects;
mod ledger_store;

pub use account_management::{AccountApiError, AccountManagement};
pub use accrual_source::AccrualSource;
pub use data_objects::{AccrualApplied, AccrualOutcome, Partition};
pub use ledger_store::{LedgerError, LedgerStore};
