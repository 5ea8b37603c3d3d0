//! An in-memory [`LedgerStore`] with the same contract as the SQLite store.
//!
//! All state sits behind one mutex, which plays the part of the database's write lock. It also records every call to
//! `apply_accrual_result` (with the tokio clock's timestamp) and can be switched into a failure mode to simulate an
//! unreachable store.
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
    Mutex,
    MutexGuard,
};

use chrono::Utc;
use tokio::time::Instant;

use crate::{
    db_types::{AccrualResult, Balance, Order, OrderNumber, OrderStatusType, Points, User, Withdrawal},
    traits::{AccountApiError, AccountManagement, AccrualApplied, LedgerError, LedgerStore},
};

#[derive(Debug, Clone)]
pub struct Application {
    pub number: OrderNumber,
    pub result: AccrualResult,
    pub outcome: AccrualApplied,
    pub at: Instant,
}

#[derive(Debug, Default)]
struct LedgerState {
    users: Vec<User>,
    orders: Vec<Order>,
    withdrawals: Vec<Withdrawal>,
    applications: Vec<Application>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    state: Arc<Mutex<LedgerState>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every operation fails with a database error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn applications(&self) -> Vec<Application> {
        self.state().applications.clone()
    }

    pub fn order(&self, number: &OrderNumber) -> Option<Order> {
        self.state().orders.iter().find(|o| &o.number == number).cloned()
    }

    pub fn user(&self, user_id: i64) -> Option<User> {
        self.state().users.iter().find(|u| u.id == user_id).cloned()
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().expect("Ledger state lock poisoned")
    }

    fn check_available(&self) -> Result<(), LedgerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(LedgerError::DatabaseError("The in-memory ledger is unavailable".into()))
        } else {
            Ok(())
        }
    }
}

impl LedgerStore for MemoryLedger {
    fn url(&self) -> &str {
        "memory://"
    }

    async fn create_user(&self, login: &str, password_hash: &str) -> Result<User, LedgerError> {
        self.check_available()?;
        let mut state = self.state();
        if state.users.iter().any(|u| u.login == login) {
            return Err(LedgerError::LoginAlreadyExists(login.to_string()));
        }
        let user = User {
            id: state.users.len() as i64 + 1,
            login: login.to_string(),
            password_hash: password_hash.to_string(),
            bonuses: Points::default(),
            withdrawn: Points::default(),
            created_at: Utc::now(),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn get_or_create_order(&self, user_id: i64, number: &OrderNumber) -> Result<(Order, bool), LedgerError> {
        self.check_available()?;
        let mut state = self.state();
        if let Some(order) = state.orders.iter().find(|o| &o.number == number) {
            return Ok((order.clone(), false));
        }
        if !state.users.iter().any(|u| u.id == user_id) {
            return Err(LedgerError::UserNotFound(user_id));
        }
        let now = Utc::now();
        let order = Order {
            id: state.orders.len() as i64 + 1,
            number: number.clone(),
            user_id,
            status: OrderStatusType::New,
            accrual: Points::default(),
            created_at: now,
            updated_at: now,
        };
        state.orders.push(order.clone());
        Ok((order, true))
    }

    async fn list_pending_orders(&self) -> Result<Vec<Order>, LedgerError> {
        self.check_available()?;
        Ok(self.state().orders.iter().filter(|o| !o.status.is_terminal()).cloned().collect())
    }

    async fn apply_accrual_result(&self, order: &Order, result: AccrualResult) -> Result<AccrualApplied, LedgerError> {
        self.check_available()?;
        let mut guard = self.state();
        let state = &mut *guard;
        let stored = state.orders.iter_mut().find(|o| o.id == order.id).ok_or(LedgerError::OrderIdNotFound(order.id))?;
        let owner = state.users.iter_mut().find(|u| u.id == stored.user_id).ok_or(LedgerError::UserNotFound(stored.user_id))?;
        let outcome = if stored.status.can_transition_to(result.status()) {
            stored.status = result.status();
            stored.accrual = result.accrual();
            stored.updated_at = Utc::now();
            owner.bonuses += result.accrual();
            AccrualApplied::Applied { status: result.status(), credited: result.accrual() }
        } else {
            AccrualApplied::Unchanged
        };
        state.applications.push(Application { number: order.number.clone(), result, outcome, at: Instant::now() });
        Ok(outcome)
    }

    async fn create_withdrawal(
        &self,
        user_id: i64,
        number: &OrderNumber,
        amount: Points,
    ) -> Result<Withdrawal, LedgerError> {
        self.check_available()?;
        let mut guard = self.state();
        let state = &mut *guard;
        if state.withdrawals.iter().any(|w| &w.number == number) {
            return Err(LedgerError::WithdrawalAlreadyExists(number.clone()));
        }
        let user = state.users.iter_mut().find(|u| u.id == user_id).ok_or(LedgerError::UserNotFound(user_id))?;
        if user.bonuses < amount {
            return Err(LedgerError::InsufficientFunds { balance: user.bonuses, requested: amount });
        }
        user.bonuses -= amount;
        user.withdrawn += amount;
        let withdrawal = Withdrawal {
            id: state.withdrawals.len() as i64 + 1,
            number: number.clone(),
            user_id,
            amount,
            created_at: Utc::now(),
        };
        state.withdrawals.push(withdrawal.clone());
        Ok(withdrawal)
    }
}

impl AccountManagement for MemoryLedger {
    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, AccountApiError> {
        Ok(self.user(user_id))
    }

    async fn fetch_user_by_login(&self, login: &str) -> Result<Option<User>, AccountApiError> {
        Ok(self.state().users.iter().find(|u| u.login == login).cloned())
    }

    async fn fetch_balance(&self, user_id: i64) -> Result<Option<Balance>, AccountApiError> {
        Ok(self.user(user_id).map(|u| u.balance()))
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, AccountApiError> {
        let mut orders =
            self.state().orders.iter().filter(|o| o.user_id == user_id).cloned().collect::<Vec<_>>();
        orders.reverse();
        Ok(orders)
    }

    async fn fetch_withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, AccountApiError> {
        Ok(self.state().withdrawals.iter().filter(|w| w.user_id == user_id).cloned().collect())
    }

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, AccountApiError> {
        Ok(self.order(number))
    }
}
