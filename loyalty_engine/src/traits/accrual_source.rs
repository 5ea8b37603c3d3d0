use crate::{db_types::OrderNumber, traits::AccrualOutcome};

/// Anything that can tell us how far along the accrual calculation for an order is.
///
/// Implementations classify every failure into an [`AccrualOutcome`] variant. There is no error path: the
/// reconciliation cycle decides what each outcome means for the order and the worker.
#[allow(async_fn_in_trait)]
pub trait AccrualSource {
    async fn fetch_accrual(&self, number: &OrderNumber) -> AccrualOutcome;
}
