use sqlx::SqliteConnection;

use super::users::is_unique_violation;
use crate::{
    db_types::{OrderNumber, Points, Withdrawal},
    traits::LedgerError,
};

/// Records a withdrawal. The balance must already have been debited in the same transaction.
pub async fn insert_withdrawal(
    user_id: i64,
    number: &OrderNumber,
    amount: Points,
    conn: &mut SqliteConnection,
) -> Result<Withdrawal, LedgerError> {
    let result = sqlx::query_as("INSERT INTO withdrawals (number, user_id, withdrawn) VALUES ($1, $2, $3) RETURNING *")
        .bind(number.as_str())
        .bind(user_id)
        .bind(amount.value())
        .fetch_one(conn)
        .await;
    match result {
        Ok(withdrawal) => Ok(withdrawal),
        Err(e) if is_unique_violation(&e) => Err(LedgerError::WithdrawalAlreadyExists(number.clone())),
        Err(e) => Err(e.into()),
    }
}

/// Oldest first
pub async fn fetch_withdrawals_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Withdrawal>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM withdrawals WHERE user_id = $1 ORDER BY created_at ASC, id ASC")
        .bind(user_id)
        .fetch_all(conn)
        .await
}
