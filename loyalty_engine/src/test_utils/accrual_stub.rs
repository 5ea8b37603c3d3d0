use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use tokio::time::Instant;

use crate::{
    db_types::OrderNumber,
    traits::{AccrualOutcome, AccrualSource},
};

/// An [`AccrualSource`] that replays scripted outcomes per order number.
///
/// Outcomes are consumed in order; the last one repeats forever. Orders without a script are `NotYetKnown`. Every
/// call is recorded with the tokio clock's timestamp.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAccrualSource {
    scripts: Arc<Mutex<HashMap<OrderNumber, VecDeque<AccrualOutcome>>>>,
    calls: Arc<Mutex<Vec<(OrderNumber, Instant)>>>,
}

impl ScriptedAccrualSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script<I>(&self, number: &OrderNumber, outcomes: I) -> &Self
    where I: IntoIterator<Item = AccrualOutcome> {
        let mut scripts = self.scripts.lock().expect("Script lock poisoned");
        scripts.entry(number.clone()).or_default().extend(outcomes);
        self
    }

    pub fn calls(&self) -> Vec<(OrderNumber, Instant)> {
        self.calls.lock().expect("Call log lock poisoned").clone()
    }

    pub fn calls_for(&self, number: &OrderNumber) -> Vec<Instant> {
        self.calls().into_iter().filter(|(n, _)| n == number).map(|(_, at)| at).collect()
    }
}

impl AccrualSource for ScriptedAccrualSource {
    async fn fetch_accrual(&self, number: &OrderNumber) -> AccrualOutcome {
        self.calls.lock().expect("Call log lock poisoned").push((number.clone(), Instant::now()));
        let mut scripts = self.scripts.lock().expect("Script lock poisoned");
        match scripts.get_mut(number) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(AccrualOutcome::NotYetKnown),
            Some(queue) => queue.front().cloned().unwrap_or(AccrualOutcome::NotYetKnown),
            None => AccrualOutcome::NotYetKnown,
        }
    }
}
