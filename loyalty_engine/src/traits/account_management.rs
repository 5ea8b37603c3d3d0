use thiserror::Error;

use crate::db_types::{Balance, Order, OrderNumber, User, Withdrawal};

#[derive(Debug, Clone, Error)]
pub enum AccountApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("User error constructing query: {0}")]
    QueryError(String),
}

impl From<sqlx::Error> for AccountApiError {
    fn from(e: sqlx::Error) -> Self {
        AccountApiError::DatabaseError(e.to_string())
    }
}

/// The `AccountManagement` trait defines the read-only queries for users, their orders and their withdrawals.
///
/// All mutations go through [`crate::traits::LedgerStore`].
#[allow(async_fn_in_trait)]
pub trait AccountManagement {
    /// Fetches the user with the given id. If no such user exists, `None` is returned.
    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, AccountApiError>;

    async fn fetch_user_by_login(&self, login: &str) -> Result<Option<User>, AccountApiError>;

    /// The current points balance and running withdrawal total for the user, or `None` if the user does not exist.
    async fn fetch_balance(&self, user_id: i64) -> Result<Option<Balance>, AccountApiError>;

    /// All orders submitted by the user, newest first.
    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, AccountApiError>;

    /// All withdrawals made by the user, oldest first.
    async fn fetch_withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, AccountApiError>;

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, AccountApiError>;
}
