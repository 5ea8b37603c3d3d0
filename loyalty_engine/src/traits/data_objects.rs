use std::time::Duration;

use crate::db_types::{AccrualResult, OrderStatusType, Points};

/// A slice of the pending-order set, selected by order identity: an order belongs to partition `index` when
/// `order.id % count == index`. At most `limit` orders with an id greater than `after` are returned, lowest id first.
///
/// `after` is a keyset cursor. Paging through a partition with it means orders that stay pending for a long time
/// cannot hide the ones behind them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub index: u32,
    pub count: u32,
    pub limit: u32,
    pub after: i64,
}

impl Partition {
    pub fn new(index: u32, count: u32, limit: u32) -> Self {
        let count = count.max(1);
        Self { index: index % count, count, limit, after: 0 }
    }

    /// The same partition, starting after order id `after`.
    pub fn starting_after(self, after: i64) -> Self {
        Self { after, ..self }
    }

    /// A single partition covering every pending order.
    pub fn everything(limit: u32) -> Self {
        Self::new(0, 1, limit)
    }

    /// Splits the pending-order set into `count` disjoint partitions that together cover every order.
    pub fn split(count: u32, limit: u32) -> impl Iterator<Item = Partition> {
        let count = count.max(1);
        (0..count).map(move |index| Partition::new(index, count, limit))
    }

    pub fn contains(&self, order_id: i64) -> bool {
        order_id.rem_euclid(i64::from(self.count)) == i64::from(self.index)
    }

    /// True if `order_id` is in this partition and past the cursor.
    pub fn selects(&self, order_id: i64) -> bool {
        order_id > self.after && self.contains(order_id)
    }
}

/// The result of applying an accrual result to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccrualApplied {
    /// The order moved to `status` and the owner was credited with `credited` points (possibly zero).
    Applied { status: OrderStatusType, credited: Points },
    /// The transition was not allowed from the order's current status, typically because the same result was already
    /// applied. Nothing was written.
    Unchanged,
}

impl AccrualApplied {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// What the accrual service had to say about a single order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccrualOutcome {
    /// The service knows the order. Apply the result to the ledger.
    Resolved(AccrualResult),
    /// The service is rate limiting. Do not query it again before `retry_after` has elapsed.
    Throttled { retry_after: Duration },
    /// The service has not registered the order yet. Leave it as it is.
    NotYetKnown,
    /// Network failure, unexpected status or undecodable body. The order is retried next cycle.
    TransientError(String),
    /// The response could not be acted upon at all (e.g. a 429 without a usable `Retry-After`). Only this request
    /// is abandoned.
    FatalError(String),
}
