//! # Loyalty engine public API
//!
//! The `loyalty_api` module exposes the programmatic API for the loyalty engine.
//!
//! * [`accounts_api`] registers users and handles balances and withdrawals.
//! * [`order_flow_api`] accepts order numbers from users.
//! * [`accrual_flow_api`] runs the reconciliation cycle against the external accrual service.
//!
//! # API usage
//!
//! Every API is created by supplying a backend that implements the traits it needs.
//!
//! ```rust,ignore
//! use loyalty_engine::{OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/loyalty.db", 10).await?;
//! let api = OrderFlowApi::new(db);
//! let result = api.submit_order(user_id, "79927398713").await?;
//! ```
pub mod accounts_api;
pub mod accrual_flow_api;
pub mod errors;
pub mod order_flow_api;
