use std::time::Duration;

use log::*;
use loyalty_engine::{AccrualFlowApi, AccrualSource, LedgerStore, ReconciliationError};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Runs reconciliation cycles until `cancel` fires or a cycle fails fatally.
///
/// The first cycle starts immediately. Each subsequent cycle starts `period` after the previous one started, or as
/// soon as it finishes if it overran. Cycles never overlap, and cancellation is only observed between cycles, so a
/// cycle that is in progress (including any throttle pauses) always runs to completion.
///
/// A fatal cycle error (the ledger could not be read) is returned to the caller, who is expected to shut down.
pub async fn run_accrual_worker<B, S>(
    api: &AccrualFlowApi<B, S>,
    period: Duration,
    cancel: CancellationToken,
) -> Result<(), ReconciliationError>
where
    B: LedgerStore,
    S: AccrualSource,
{
    let mut timer = interval(period.max(MIN_INTERVAL));
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("🕰️ Accrual worker started. Reconciling every {}ms", period.as_millis());
    let mut cycles = 0u64;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("🕰️ Accrual worker stopped after {cycles} cycles");
                return Ok(());
            },
            _ = timer.tick() => {},
        }
        cycles += 1;
        trace!("🕰️ Starting reconciliation cycle #{cycles}");
        match api.run_cycle().await {
            Ok(summary) => trace!("🕰️ Cycle #{cycles} finished. {summary}"),
            Err(e) => {
                error!("🕰️ Reconciliation cycle #{cycles} failed. The accrual worker is shutting down. {e}");
                return Err(e);
            },
        }
    }
}
