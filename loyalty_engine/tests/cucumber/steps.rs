use std::time::{Duration, Instant};

use cucumber::{then, when};
use loyalty_engine::{
    db_types::{AccrualResult, OrderNumber, OrderStatusType, Points},
    AccrualOutcome,
    LoyaltyApiError,
    SubmitOrderResult,
};

use crate::cucumber::LoyaltyWorld;

fn points(value: f64) -> Points {
    Points::from_decimal(value).expect("Not a valid points value")
}

fn number(raw: &str) -> OrderNumber {
    OrderNumber::parse(raw).expect("Not a valid order number")
}

#[when(expr = "'{word}' submits order '{word}'")]
async fn submit_order(world: &mut LoyaltyWorld, login: String, raw: String) {
    let system = world.system();
    let user_id = system.user(&login).id;
    let result = system.orders.submit_order(user_id, &raw).await;
    system.last_submission = Some(result);
}

#[then("the submission is accepted")]
async fn submission_accepted(world: &mut LoyaltyWorld) {
    let result = world.system().last_submission.take().expect("No order was submitted");
    assert!(matches!(result, Ok(SubmitOrderResult::Accepted(_))), "Expected an accepted order, got {result:?}");
}

#[then(expr = "the order was already submitted by '{word}'")]
async fn already_submitted(world: &mut LoyaltyWorld, login: String) {
    let system = world.system();
    let user_id = system.user(&login).id;
    match system.last_submission.take().expect("No order was submitted") {
        Ok(SubmitOrderResult::AlreadySubmitted(order)) => assert_eq!(order.user_id, user_id),
        other => panic!("Expected an order that was already submitted, got {other:?}"),
    }
}

#[then("the submission is rejected as a conflict")]
async fn submission_conflict(world: &mut LoyaltyWorld) {
    let result = world.system().last_submission.take().expect("No order was submitted");
    assert!(matches!(result, Err(LoyaltyApiError::Conflict(_))), "Expected a conflict, got {result:?}");
}

#[then("the submission is rejected as invalid")]
async fn submission_invalid(world: &mut LoyaltyWorld) {
    let result = world.system().last_submission.take().expect("No order was submitted");
    assert!(matches!(result, Err(LoyaltyApiError::Validation(_))), "Expected a validation error, got {result:?}");
}

#[when(expr = "the accrual service reports order '{word}' as {word} with {float} points")]
async fn accrual_reports(world: &mut LoyaltyWorld, raw: String, status: String, accrual: f64) {
    let result = match status.as_str() {
        "REGISTERED" | "PROCESSING" => AccrualResult::processing(),
        "PROCESSED" => AccrualResult::processed(points(accrual)),
        "INVALID" => AccrualResult::new(OrderStatusType::Invalid, points(accrual)),
        s => panic!("Unknown accrual status {s}"),
    };
    world.system().accrual.source().script(&number(&raw), [AccrualOutcome::Resolved(result)]);
}

#[when(expr = "the accrual service throttles order '{word}' for {int} seconds")]
async fn accrual_throttles(world: &mut LoyaltyWorld, raw: String, seconds: u64) {
    let outcome = AccrualOutcome::Throttled { retry_after: Duration::from_secs(seconds) };
    world.system().accrual.source().script(&number(&raw), [outcome]);
}

#[when("a reconciliation cycle runs")]
async fn run_cycle(world: &mut LoyaltyWorld) {
    let system = world.system();
    let start = Instant::now();
    let summary = system.accrual.run_cycle().await.expect("Reconciliation cycle failed");
    system.last_cycle = Some((summary, start.elapsed()));
}

#[then(expr = "the cycle took at least {int} seconds")]
async fn cycle_duration(world: &mut LoyaltyWorld, seconds: u64) {
    let (_, elapsed) = world.system().last_cycle.expect("No cycle has run");
    assert!(elapsed >= Duration::from_secs(seconds), "The cycle took {elapsed:?}");
}

#[then(expr = "the last cycle saw {int} orders")]
async fn cycle_orders(world: &mut LoyaltyWorld, count: usize) {
    let (summary, _) = world.system().last_cycle.expect("No cycle has run");
    assert_eq!(summary.seen, count);
}

#[then(expr = "order '{word}' is {word} with an accrual of {float}")]
async fn order_state(world: &mut LoyaltyWorld, raw: String, status: String, accrual: f64) {
    let order = world.system().orders.fetch_order(&raw).await.expect("Error fetching order").expect("No such order");
    let status = status.parse::<OrderStatusType>().expect("Not an order status");
    assert_eq!(order.status, status);
    assert_eq!(order.accrual, points(accrual));
}

#[then(expr = "'{word}' has a balance of {float}")]
async fn balance(world: &mut LoyaltyWorld, login: String, expected: f64) {
    let system = world.system();
    let balance = system.accounts.balance(system.user(&login).id).await.expect("Error fetching balance");
    assert_eq!(balance.current, points(expected), "Balance is {}", balance.current);
}

#[then(expr = "'{word}' has withdrawn {float}")]
async fn withdrawn(world: &mut LoyaltyWorld, login: String, expected: f64) {
    let system = world.system();
    let user_id = system.user(&login).id;
    let balance = system.accounts.balance(user_id).await.expect("Error fetching balance");
    assert_eq!(balance.withdrawn, points(expected));
    let total: Points = system.accounts.withdrawals(user_id).await.unwrap().iter().map(|w| w.amount).sum();
    assert_eq!(total, points(expected));
}

#[then(expr = "'{word}' has {int} order(s)")]
async fn order_count(world: &mut LoyaltyWorld, login: String, count: usize) {
    let system = world.system();
    let orders = system.accounts.orders(system.user(&login).id).await.expect("Error fetching orders");
    assert_eq!(orders.len(), count);
}

#[when(expr = "'{word}' withdraws {float} points against order '{word}'")]
async fn withdraw(world: &mut LoyaltyWorld, login: String, amount: f64, raw: String) {
    let system = world.system();
    let user_id = system.user(&login).id;
    let result = system.accounts.withdraw(user_id, &raw, points(amount)).await;
    system.last_withdrawal = Some(result);
}

#[then("the withdrawal is accepted")]
async fn withdrawal_accepted(world: &mut LoyaltyWorld) {
    let result = world.system().last_withdrawal.take().expect("No withdrawal was made");
    assert!(result.is_ok(), "Expected a successful withdrawal, got {result:?}");
}

#[then("the withdrawal is rejected for insufficient funds")]
async fn withdrawal_rejected(world: &mut LoyaltyWorld) {
    let result = world.system().last_withdrawal.take().expect("No withdrawal was made");
    assert!(matches!(result, Err(LoyaltyApiError::InsufficientFunds { .. })), "Got {result:?}");
}
