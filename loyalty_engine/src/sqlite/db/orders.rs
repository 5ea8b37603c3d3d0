use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::users::is_unique_violation;
use crate::{
    db_types::{AccrualResult, Order, OrderNumber, OrderStatusType},
    traits::{LedgerError, Partition},
};

/// Inserts a new order for `user_id`, or returns the existing order with this number. The second element of the
/// result is `true` if the order was inserted.
///
/// The insert is attempted first and the UNIQUE constraint on `number` decides who wins a race. The loser falls back
/// to reading the winning row.
pub async fn idempotent_insert(
    user_id: i64,
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<(Order, bool), LedgerError> {
    match insert_order(user_id, number, conn).await {
        Ok(order) => {
            debug!("🗃️ Order [{number}] inserted with id {} for user #{user_id}", order.id);
            Ok((order, true))
        },
        Err(e) if is_unique_violation(&e) => {
            trace!("🗃️ Order [{number}] already exists");
            // Orders are never deleted, so the row that beat us is still there
            let order = fetch_order_by_number(number, conn).await?.ok_or_else(|| {
                LedgerError::DatabaseError(format!("Order [{number}] violates uniqueness but cannot be found"))
            })?;
            Ok((order, false))
        },
        Err(e) => Err(e.into()),
    }
}

async fn insert_order(user_id: i64, number: &OrderNumber, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    sqlx::query_as("INSERT INTO orders (number, user_id) VALUES ($1, $2) RETURNING *")
        .bind(number.as_str())
        .bind(user_id)
        .fetch_one(conn)
        .await
}

pub async fn fetch_order_by_number(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE number = $1").bind(number.as_str()).fetch_optional(conn).await
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await
}

/// Newest first
pub async fn fetch_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await
}

/// Fetches orders that have not reached a terminal status, lowest id first. If a partition is given, only the orders
/// in that partition with an id past its cursor are returned, up to the partition's limit.
pub async fn fetch_pending_orders(
    partition: Option<Partition>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM orders WHERE status NOT IN (");
    let mut terminal = builder.separated(", ");
    for status in OrderStatusType::TERMINAL {
        terminal.push_bind(status);
    }
    terminal.push_unseparated(")");
    if let Some(p) = partition {
        builder.push(" AND id % ");
        builder.push_bind(i64::from(p.count));
        builder.push(" = ");
        builder.push_bind(i64::from(p.index));
        builder.push(" AND id > ");
        builder.push_bind(p.after);
    }
    builder.push(" ORDER BY id ASC");
    if let Some(p) = partition {
        builder.push(" LIMIT ");
        builder.push_bind(i64::from(p.limit));
    }
    trace!("🗃️ Executing query: {}", builder.sql());
    builder.build_query_as::<Order>().fetch_all(conn).await
}

/// Moves the order to the status in `result`, but only if its current status is allowed to precede the target.
/// Returns the updated order, or `None` if the order was not in a suitable state (or does not exist).
pub async fn transition_order(
    id: i64,
    result: &AccrualResult,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let sources = OrderStatusType::sources_for(result.status());
    if sources.is_empty() {
        return Ok(None);
    }
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE orders SET status = ");
    builder.push_bind(result.status());
    builder.push(", accrual = ");
    builder.push_bind(result.accrual().value());
    builder.push(", updated_at = CURRENT_TIMESTAMP WHERE id = ");
    builder.push_bind(id);
    builder.push(" AND status IN (");
    let mut allowed = builder.separated(", ");
    for status in sources {
        allowed.push_bind(*status);
    }
    allowed.push_unseparated(") RETURNING *");
    builder.build_query_as::<Order>().fetch_optional(conn).await
}
