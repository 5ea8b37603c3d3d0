//! `SqliteDatabase` is a concrete implementation of a loyalty ledger backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
//!
//! SQLite serialises writers at the database level. Every transaction here starts with its write, so the write lock
//! is taken up front and concurrent transactions queue behind it (up to the pool's busy timeout) instead of racing on
//! stale reads.
use std::fmt::Debug;

use log::*;
use sqlx::{migrate, SqlitePool};

use super::db::{db_url, new_pool, orders, users, withdrawals};
use crate::{
    db_types::{AccrualResult, Balance, Order, OrderNumber, Points, User, Withdrawal},
    traits::{AccountApiError, AccountManagement, AccrualApplied, LedgerError, LedgerStore, Partition},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl LedgerStore for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_user(&self, login: &str, password_hash: &str) -> Result<User, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::insert_user(login, password_hash, &mut conn).await?;
        debug!("🗃️ User '{login}' registered with id {}", user.id);
        Ok(user)
    }

    async fn get_or_create_order(&self, user_id: i64, number: &OrderNumber) -> Result<(Order, bool), LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::idempotent_insert(user_id, number, &mut conn).await
    }

    async fn list_pending_orders(&self) -> Result<Vec<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_pending_orders(None, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_pending_partition(&self, partition: Partition) -> Result<Vec<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_pending_orders(Some(partition), &mut conn).await?;
        trace!(
            "🗃️ Partition {}/{} has {} pending orders after id {} (limit {})",
            partition.index,
            partition.count,
            orders.len(),
            partition.after,
            partition.limit
        );
        Ok(orders)
    }

    /// In a single atomic transaction,
    /// * moves the order to the new status, if the current status allows it,
    /// * sets the order's accrual,
    /// * credits the order's owner with the accrual, if it is non-zero.
    ///
    /// If the status change is not allowed, the transaction is rolled back and nothing changes.
    async fn apply_accrual_result(&self, order: &Order, result: AccrualResult) -> Result<AccrualApplied, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let Some(updated) = orders::transition_order(order.id, &result, &mut tx).await? else {
            let current = orders::fetch_order_by_id(order.id, &mut tx).await?;
            tx.rollback().await?;
            let current = current.ok_or(LedgerError::OrderIdNotFound(order.id))?;
            trace!(
                "🗃️ Order [{}] is {}. Ignoring the transition to {}",
                current.number,
                current.status,
                result.status()
            );
            return Ok(AccrualApplied::Unchanged);
        };
        let credited = updated.accrual;
        if credited.is_positive() {
            users::credit_bonuses(updated.user_id, credited, &mut tx).await?;
        }
        tx.commit().await?;
        debug!(
            "🗃️ Order [{}] is now {}. User #{} credited with {credited}",
            updated.number, updated.status, updated.user_id
        );
        Ok(AccrualApplied::Applied { status: updated.status, credited })
    }

    /// Takes a withdrawal request, and in a single atomic transaction,
    /// * debits the balance and increments the withdrawal total, provided the balance covers the amount,
    /// * records the withdrawal against the order number.
    ///
    /// If either step fails, the transaction is rolled back.
    async fn create_withdrawal(
        &self,
        user_id: i64,
        number: &OrderNumber,
        amount: Points,
    ) -> Result<Withdrawal, LedgerError> {
        let mut tx = self.pool.begin().await?;
        if !users::debit_for_withdrawal(user_id, amount, &mut tx).await? {
            let balance = users::fetch_balance(user_id, &mut tx).await?;
            tx.rollback().await?;
            let balance = balance.ok_or(LedgerError::UserNotFound(user_id))?;
            debug!("🗃️ User #{user_id} cannot withdraw {amount}. Balance is {}", balance.current);
            return Err(LedgerError::InsufficientFunds { balance: balance.current, requested: amount });
        }
        let withdrawal = withdrawals::insert_withdrawal(user_id, number, amount, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ User #{user_id} withdrew {amount} against order [{number}]");
        Ok(withdrawal)
    }

    async fn close(&mut self) -> Result<(), LedgerError> {
        self.pool.close().await;
        Ok(())
    }
}

impl AccountManagement for SqliteDatabase {
    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user_by_id(user_id, &mut conn).await?;
        Ok(user)
    }

    async fn fetch_user_by_login(&self, login: &str) -> Result<Option<User>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user_by_login(login, &mut conn).await?;
        Ok(user)
    }

    async fn fetch_balance(&self, user_id: i64) -> Result<Option<Balance>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let balance = users::fetch_balance(user_id, &mut conn).await?;
        Ok(balance)
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_user(user_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let withdrawals = withdrawals::fetch_withdrawals_for_user(user_id, &mut conn).await?;
        Ok(withdrawals)
    }

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_number(number, &mut conn).await?;
        Ok(order)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    /// Connects to the database at `url`, creating it if necessary, and brings the schema up to date.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        migrate!("./src/sqlite/migrations").run(&pool).await?;
        info!("🗃️ Database schema is up to date");
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
