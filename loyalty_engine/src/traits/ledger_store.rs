use thiserror::Error;

use crate::{
    db_types::{AccrualResult, Order, OrderNumber, Points, User, Withdrawal},
    traits::{data_objects::AccrualApplied, AccountApiError, AccountManagement, Partition},
};

/// This trait defines every state change the loyalty ledger supports.
///
/// The ledger store is the only component allowed to touch a user's balance, a user's withdrawal total, and an
/// order's status and accrual. Every method is atomic: multi-row changes happen in a single database transaction,
/// so a failure never leaves a half-applied change behind.
#[allow(async_fn_in_trait)]
pub trait LedgerStore: Clone + AccountManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Registers a new user with a zero balance. The login must be unique.
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<User, LedgerError>;

    /// Returns the order with the given number, creating it for `user_id` with status `NEW` if it does not exist yet.
    ///
    /// The second element is `true` if the order was created by this call. If two callers race to submit the same
    /// number, exactly one of them creates it; the other receives the existing order and `false`. Ownership is
    /// the caller's concern.
    async fn get_or_create_order(&self, user_id: i64, number: &OrderNumber) -> Result<(Order, bool), LedgerError>;

    /// All orders that have not reached a terminal status, in no particular order.
    async fn list_pending_orders(&self) -> Result<Vec<Order>, LedgerError>;

    /// The pending orders that fall into the given partition and lie past its cursor, lowest id first.
    async fn fetch_pending_partition(&self, partition: Partition) -> Result<Vec<Order>, LedgerError> {
        let mut orders = self.list_pending_orders().await?;
        orders.retain(|o| partition.selects(o.id));
        orders.sort_by_key(|o| o.id);
        orders.truncate(partition.limit as usize);
        Ok(orders)
    }

    /// Moves the order to the status in `result` and credits the owner with the accrual, in one transaction.
    ///
    /// The status change is a compare-and-set against the statuses that may legally precede the target. If the
    /// order has already moved past them (e.g. the same result is applied twice) nothing is written and
    /// [`AccrualApplied::Unchanged`] is returned, so the owner is never credited twice.
    async fn apply_accrual_result(&self, order: &Order, result: AccrualResult) -> Result<AccrualApplied, LedgerError>;

    /// Debits `amount` from the user's balance, adds it to their withdrawal total and records the withdrawal against
    /// `number`, in one transaction.
    ///
    /// Fails with [`LedgerError::InsufficientFunds`] if the balance at the time of the debit is less than `amount`.
    async fn create_withdrawal(
        &self,
        user_id: i64,
        number: &OrderNumber,
        amount: Points,
    ) -> Result<Withdrawal, LedgerError>;

    /// Releases the underlying resources.
    async fn close(&mut self) -> Result<(), LedgerError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The login '{0}' is already taken")]
    LoginAlreadyExists(String),
    #[error("Order {0} has already been submitted by another user")]
    OrderOwnedByAnotherUser(OrderNumber),
    #[error("A withdrawal against order {0} already exists")]
    WithdrawalAlreadyExists(OrderNumber),
    #[error("Insufficient funds. Requested {requested}, but the balance is {balance}")]
    InsufficientFunds { balance: Points, requested: Points },
    #[error("The requested user id {0} does not exist")]
    UserNotFound(i64),
    #[error("The requested order (internal id {0}) does not exist")]
    OrderIdNotFound(i64),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

impl From<AccountApiError> for LedgerError {
    fn from(e: AccountApiError) -> Self {
        match e {
            AccountApiError::DatabaseError(s) | AccountApiError::QueryError(s) => LedgerError::DatabaseError(s),
        }
    }
}
