//! # Loyalty points server
//!
//! Hosts the accrual worker that keeps the loyalty ledger in step with the external accrual service. On a fixed
//! interval it picks up every order that is not yet in a final state, asks the accrual service about it and records
//! the result, crediting any points earned to the order owner's balance.
//!
//! ## Configuration
//! The server is configured via environment variables, some of which can be overridden on the command line. Run
//! with `--show-env` to list them, and see [config](config/index.html) for the defaults.
pub mod accrual_worker;
pub mod cli;
pub mod config;
pub mod errors;
pub mod integrations;
pub mod server;
