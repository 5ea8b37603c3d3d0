//! # Accrual tools
//!
//! A thin client for the external accrual calculation service. The service is a black box that, given an order
//! number, reports whether it knows about the order, how far along its calculation is, and how many points the order
//! earned.
//!
//! [`AccrualApi::fetch_order`] classifies every response into an [`AccrualLookup`] or an [`AccrualApiError`]. It
//! retries connection-level failures according to the injected [`RetryPolicy`], but never retries a throttled (429)
//! response: deciding how to back off is the caller's business.
mod api;
mod config;
mod error;
mod retry;

mod data_objects;
pub mod helpers;

pub use api::{AccrualApi, GET_ORDER_PATH};
pub use config::AccrualConfig;
pub use data_objects::{AccrualLookup, AccrualResponse, AccrualStatus};
pub use error::AccrualApiError;
pub use retry::RetryPolicy;
