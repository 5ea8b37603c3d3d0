//! Loyalty Engine
//!
//! The loyalty engine keeps the points ledger for a loyalty programme: users submit the numbers of orders they have
//! placed, an external accrual service decides how many points each order earns, and users withdraw points against
//! new orders.
//!
//! The library is divided into three main sections:
//! 1. The ledger contracts ([`mod@traits`]) and their SQLite implementation ([`SqliteDatabase`]). The ledger store
//!    owns every change to balances and order statuses, and makes each change in a single transaction. The data types
//!    it stores are defined in [`mod@db_types`] and are public.
//! 2. The public API. [`AccountApi`] and [`OrderFlowApi`] serve the (external) request handlers. [`AccrualFlowApi`]
//!    runs the reconciliation cycle that polls the accrual service and credits balances.
//! 3. Test utilities (behind the `test_utils` feature): temporary databases, an in-memory ledger and a scripted
//!    accrual source.
pub mod db_types;
pub mod helpers;
mod loyalty_api;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use loyalty_api::{
    accounts_api::AccountApi,
    accrual_flow_api::{AccrualFlowApi, CycleSummary, ReconciliationOptions, DEFAULT_BATCH_SIZE, DEFAULT_WORKERS},
    errors::{LoyaltyApiError, ReconciliationError},
    order_flow_api::{OrderFlowApi, SubmitOrderResult},
};
#[cfg(feature = "sqlite")]
pub use sqlite::{db as sqlite_db, SqliteDatabase};
pub use traits::{
    AccountApiError,
    AccountManagement,
    AccrualApplied,
    AccrualOutcome,
    AccrualSource,
    LedgerError,
    LedgerStore,
    Partition,
};
