//! The reconciliation cycle.
//!
//! A cycle splits the pending orders into one partition per worker (by order id, so no two workers ever see the same
//! order) and drains every partition concurrently. Each worker walks its partition in id order, asks the accrual
//! source about each order and writes any result through the ledger store.
//!
//! A worker handles at most `batch_size` orders per cycle. It remembers the last order it reached and carries on from
//! there next cycle, wrapping back to the start once it runs off the end of its partition. Orders that stay pending
//! therefore never stop the worker from reaching the ones behind them.
//!
//! When the accrual service throttles a worker, that worker stops, sleeps for the requested time and then reports
//! back. Its siblings carry on. The only error that ends a cycle early is a failure to read a partition from the
//! store; the remaining workers are dropped at their next suspension point.
use std::{
    fmt::{Debug, Display},
    ops::{Add, AddAssign},
    sync::atomic::{AtomicI64, Ordering},
};

use futures_util::future::try_join_all;
use log::*;
use tokio::time::sleep;

use crate::{
    db_types::Order,
    loyalty_api::errors::ReconciliationError,
    traits::{AccrualApplied, AccrualOutcome, AccrualSource, LedgerStore, Partition},
};

pub const DEFAULT_WORKERS: u32 = 10;
pub const DEFAULT_BATCH_SIZE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciliationOptions {
    /// The number of concurrent workers (and so, partitions) per cycle.
    pub workers: u32,
    /// The maximum number of orders a single worker handles per cycle.
    pub batch_size: u32,
}

impl Default for ReconciliationOptions {
    fn default() -> Self {
        Self { workers: DEFAULT_WORKERS, batch_size: DEFAULT_BATCH_SIZE }
    }
}

impl ReconciliationOptions {
    pub fn new(workers: u32, batch_size: u32) -> Self {
        Self { workers: workers.max(1), batch_size: batch_size.max(1) }
    }
}

/// Tallies of what happened to each order during a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Orders read from the store
    pub seen: usize,
    /// Orders whose status moved forward
    pub applied: usize,
    /// Results that were already applied, or would have moved the order backwards
    pub unchanged: usize,
    pub not_yet_known: usize,
    /// Network failures, unexpected responses, and failed writes. Retried next cycle.
    pub transient: usize,
    /// Responses that could not be acted upon at all
    pub rejected: usize,
    /// Partitions cut short by a 429 from the accrual service
    pub throttled_partitions: usize,
}

impl CycleSummary {
    /// Orders that were read but not queried because their worker was throttled.
    pub fn skipped(&self) -> usize {
        self.seen.saturating_sub(self.applied + self.unchanged + self.not_yet_known + self.transient + self.rejected)
    }
}

impl AddAssign for CycleSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.seen += rhs.seen;
        self.applied += rhs.applied;
        self.unchanged += rhs.unchanged;
        self.not_yet_known += rhs.not_yet_known;
        self.transient += rhs.transient;
        self.rejected += rhs.rejected;
        self.throttled_partitions += rhs.throttled_partitions;
    }
}

impl Add for CycleSummary {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl Display for CycleSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} orders: {} applied, {} unchanged, {} not yet known, {} transient failures, {} rejected, {} skipped. {} \
             partitions throttled",
            self.seen,
            self.applied,
            self.unchanged,
            self.not_yet_known,
            self.transient,
            self.rejected,
            self.skipped(),
            self.throttled_partitions
        )
    }
}

/// `AccrualFlowApi` reconciles pending orders against an external accrual source.
pub struct AccrualFlowApi<B, S> {
    db: B,
    source: S,
    options: ReconciliationOptions,
    /// Per-partition keyset cursors: the id each worker resumes after.
    cursors: Vec<AtomicI64>,
}

impl<B, S> Debug for AccrualFlowApi<B, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccrualFlowApi ({:?})", self.options)
    }
}

impl<B, S> AccrualFlowApi<B, S> {
    pub fn new(db: B, source: S, options: ReconciliationOptions) -> Self {
        let cursors = (0..options.workers.max(1)).map(|_| AtomicI64::new(0)).collect();
        Self { db, source, options, cursors }
    }

    pub fn options(&self) -> ReconciliationOptions {
        self.options
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn cursor(&self, index: u32) -> i64 {
        self.cursors.get(index as usize).map(|c| c.load(Ordering::Acquire)).unwrap_or_default()
    }

    fn set_cursor(&self, partition: Partition, after: i64) {
        // Partitions from a different split have no cursor of their own.
        if partition.count as usize != self.cursors.len() {
            return;
        }
        if let Some(cursor) = self.cursors.get(partition.index as usize) {
            trace!("🔄️ Partition {}/{} resumes after order id {after}", partition.index, partition.count);
            cursor.store(after, Ordering::Release);
        }
    }
}

impl<B, S> AccrualFlowApi<B, S>
where
    B: LedgerStore,
    S: AccrualSource,
{
    /// Runs one full reconciliation cycle and waits for every worker to finish, including any throttle sleeps.
    ///
    /// Partitions are recomputed from the store on every call, so orders submitted since the last cycle are picked
    /// up.
    pub async fn run_cycle(&self) -> Result<CycleSummary, ReconciliationError> {
        let ReconciliationOptions { workers, batch_size } = self.options;
        debug!("🔄️ Starting reconciliation cycle with {workers} workers");
        let partitions = Partition::split(workers, batch_size).map(|p| p.starting_after(self.cursor(p.index)));
        let results = try_join_all(partitions.map(|p| self.process_partition(p))).await.map_err(|e| {
            error!("🔄️ Reconciliation cycle aborted. {e}");
            e
        })?;
        let summary = results.into_iter().fold(CycleSummary::default(), |total, s| total + s);
        if summary.seen > 0 {
            info!("🔄️ Reconciliation cycle complete. {summary}");
        } else {
            debug!("🔄️ Reconciliation cycle complete. No pending orders");
        }
        Ok(summary)
    }

    /// Drains a single partition, one order at a time, and moves that partition's cursor on.
    pub async fn process_partition(&self, mut partition: Partition) -> Result<CycleSummary, ReconciliationError> {
        let mut orders = self.db.fetch_pending_partition(partition).await?;
        if orders.is_empty() && partition.after > 0 {
            partition = partition.starting_after(0);
            orders = self.db.fetch_pending_partition(partition).await?;
        }
        let mut summary = CycleSummary { seen: orders.len(), ..Default::default() };
        // Where the next cycle picks up. Reaching the end of the partition wraps around to the start.
        let mut resume_after = match orders.last() {
            Some(last) if orders.len() >= partition.limit as usize => last.id,
            _ => 0,
        };
        let mut previous = partition.after;
        for order in &orders {
            match self.source.fetch_accrual(&order.number).await {
                AccrualOutcome::Resolved(result) => match self.db.apply_accrual_result(order, result).await {
                    Ok(AccrualApplied::Applied { status, credited }) => {
                        debug!("🔄️ Order [{}] is now {status}. {credited} points credited", order.number);
                        summary.applied += 1;
                    },
                    Ok(AccrualApplied::Unchanged) => {
                        trace!("🔄️ Order [{}] is already {}. Nothing to do", order.number, order.status);
                        summary.unchanged += 1;
                    },
                    Err(e) => {
                        warn!("🔄️ Could not apply the accrual result for order [{}]. {e}", order.number);
                        summary.transient += 1;
                    },
                },
                AccrualOutcome::NotYetKnown => {
                    trace!("🔄️ Order [{}] is not registered with the accrual service yet", order.number);
                    summary.not_yet_known += 1;
                },
                AccrualOutcome::TransientError(e) => {
                    warn!("🔄️ Accrual lookup for order [{}] failed. Will retry next cycle. {e}", order.number);
                    summary.transient += 1;
                },
                AccrualOutcome::FatalError(e) => {
                    warn!("🔄️ Accrual lookup for order [{}] cannot be used. {e}", order.number);
                    summary.rejected += 1;
                },
                AccrualOutcome::Throttled { retry_after } => {
                    let remaining = remaining_after(&orders, order);
                    warn!(
                        "🔄️ Partition {}/{} throttled at order [{}]. Pausing for {}s, {remaining} orders left for \
                         the next cycle",
                        partition.index,
                        partition.count,
                        order.number,
                        retry_after.as_secs()
                    );
                    summary.throttled_partitions += 1;
                    resume_after = previous;
                    sleep(retry_after).await;
                    break;
                },
            }
            previous = order.id;
        }
        self.set_cursor(partition, resume_after);
        Ok(summary)
    }
}

fn remaining_after(orders: &[Order], current: &Order) -> usize {
    orders.iter().position(|o| o.id == current.id).map(|i| orders.len() - i).unwrap_or_default()
}
