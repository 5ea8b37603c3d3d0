use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Balance, Points, User},
    traits::LedgerError,
};

/// Inserts a new user with a zero balance. A duplicate login is reported as [`LedgerError::LoginAlreadyExists`].
pub async fn insert_user(login: &str, password_hash: &str, conn: &mut SqliteConnection) -> Result<User, LedgerError> {
    let result = sqlx::query_as("INSERT INTO users (login, password_hash) VALUES ($1, $2) RETURNING *")
        .bind(login)
        .bind(password_hash)
        .fetch_one(conn)
        .await;
    match result {
        Ok(user) => Ok(user),
        Err(e) if is_unique_violation(&e) => Err(LedgerError::LoginAlreadyExists(login.to_string())),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_user_by_id(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await
}

pub async fn fetch_user_by_login(login: &str, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE login = $1").bind(login).fetch_optional(conn).await
}

pub async fn fetch_balance(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<Balance>, sqlx::Error> {
    sqlx::query_as("SELECT bonuses, withdrawn FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await
}

/// Adds `amount` to the user's balance. This is not atomic on its own; call it inside the transaction that justifies
/// the credit.
pub async fn credit_bonuses(user_id: i64, amount: Points, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    let result = sqlx::query("UPDATE users SET bonuses = bonuses + $1 WHERE id = $2")
        .bind(amount.value())
        .bind(user_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerError::UserNotFound(user_id));
    }
    trace!("🗃️ Credited {amount} to user #{user_id}");
    Ok(())
}

/// Moves `amount` from the user's balance to their withdrawal total, but only if the balance covers it.
///
/// The balance check is part of the `UPDATE` itself, so the first statement of the calling transaction takes the
/// write lock and concurrent withdrawals are serialised by the database. Returns `false` if nothing was debited.
pub async fn debit_for_withdrawal(
    user_id: i64,
    amount: Points,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE users SET
        bonuses = bonuses - $1,
        withdrawn = withdrawn + $2
        WHERE id = $3 AND bonuses >= $4
        "#,
    )
    .bind(amount.value())
    .bind(amount.value())
    .bind(user_id)
    .bind(amount.value())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error().is_some_and(|db| db.is_unique_violation())
}
