use loyalty_engine::{
    db_types::{AccrualResult, Order, OrderStatusType, Points, User},
    test_utils::{
        order_number,
        prepare_env::{prepare_test_env, random_db_path, remove_database},
    },
    AccountManagement,
    AccrualApplied,
    LedgerError,
    LedgerStore,
    Partition,
    SqliteDatabase,
};

struct TestLedger {
    url: String,
    db: SqliteDatabase,
}

impl TestLedger {
    async fn new() -> Self {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;
        Self { url, db }
    }

    async fn user(&self, login: &str) -> User {
        self.db.create_user(login, "hash").await.expect("Failed to create user")
    }

    async fn order(&self, user: &User, seed: u64) -> Order {
        let (order, created) = self.db.get_or_create_order(user.id, &order_number(seed)).await.unwrap();
        assert!(created);
        order
    }

    /// Credits the user with `amount` by pushing a fresh order straight to PROCESSED
    async fn fund(&self, user: &User, seed: u64, amount: i64) {
        let order = self.order(user, seed).await;
        let applied = self.db.apply_accrual_result(&order, AccrualResult::processed(Points::from(amount))).await.unwrap();
        assert!(applied.is_applied());
    }

    async fn balance(&self, user: &User) -> (i64, i64) {
        let balance = self.db.fetch_balance(user.id).await.unwrap().expect("User should exist");
        (balance.current.value(), balance.withdrawn.value())
    }

    async fn cleanup(mut self) {
        self.db.close().await.unwrap();
        remove_database(&self.url).await;
    }
}

#[tokio::test]
async fn applying_the_same_result_twice_credits_once() {
    let ledger = TestLedger::new().await;
    let alice = ledger.user("alice").await;
    let order = ledger.order(&alice, 7992739871).await;
    assert_eq!(order.number.as_str(), "79927398713");
    assert_eq!(order.status, OrderStatusType::New);

    let result = AccrualResult::processed(Points::from(50_000));
    let first = ledger.db.apply_accrual_result(&order, result).await.unwrap();
    assert_eq!(first, AccrualApplied::Applied { status: OrderStatusType::Processed, credited: Points::from(50_000) });
    let second = ledger.db.apply_accrual_result(&order, result).await.unwrap();
    assert_eq!(second, AccrualApplied::Unchanged);

    assert_eq!(ledger.balance(&alice).await, (50_000, 0));
    let stored = ledger.db.fetch_order_by_number(&order.number).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatusType::Processed);
    assert_eq!(stored.accrual, Points::from(50_000));
    ledger.cleanup().await;
}

#[tokio::test]
async fn concurrent_applications_credit_once() {
    let ledger = TestLedger::new().await;
    let alice = ledger.user("alice").await;
    let order = ledger.order(&alice, 1234).await;
    let result = AccrualResult::processed(Points::from(700));
    let (a, b) = tokio::join!(
        ledger.db.apply_accrual_result(&order, result),
        ledger.db.apply_accrual_result(&order, result)
    );
    let applied = [a.unwrap(), b.unwrap()].iter().filter(|r| r.is_applied()).count();
    assert_eq!(applied, 1);
    assert_eq!(ledger.balance(&alice).await, (700, 0));
    ledger.cleanup().await;
}

#[tokio::test]
async fn status_never_moves_backwards() {
    let ledger = TestLedger::new().await;
    let alice = ledger.user("alice").await;
    let order = ledger.order(&alice, 555).await;
    let db = &ledger.db;

    assert!(db.apply_accrual_result(&order, AccrualResult::processing()).await.unwrap().is_applied());
    assert_eq!(db.apply_accrual_result(&order, AccrualResult::processing()).await.unwrap(), AccrualApplied::Unchanged);
    let applied = db.apply_accrual_result(&order, AccrualResult::processed(Points::from(120))).await.unwrap();
    assert_eq!(applied, AccrualApplied::Applied { status: OrderStatusType::Processed, credited: Points::from(120) });
    assert_eq!(db.apply_accrual_result(&order, AccrualResult::processing()).await.unwrap(), AccrualApplied::Unchanged);
    assert_eq!(db.apply_accrual_result(&order, AccrualResult::invalid()).await.unwrap(), AccrualApplied::Unchanged);
    let applied = db.apply_accrual_result(&order, AccrualResult::processed(Points::from(999))).await.unwrap();
    assert_eq!(applied, AccrualApplied::Unchanged);

    let stored = db.fetch_order_by_number(&order.number).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatusType::Processed);
    assert_eq!(stored.accrual, Points::from(120));
    assert_eq!(ledger.balance(&alice).await, (120, 0));
    ledger.cleanup().await;
}

#[tokio::test]
async fn invalid_orders_earn_nothing() {
    let ledger = TestLedger::new().await;
    let alice = ledger.user("alice").await;
    let order = ledger.order(&alice, 4242).await;
    let result = AccrualResult::new(OrderStatusType::Invalid, Points::from(500));
    let applied = ledger.db.apply_accrual_result(&order, result).await.unwrap();
    assert_eq!(applied, AccrualApplied::Applied { status: OrderStatusType::Invalid, credited: Points::default() });
    assert_eq!(ledger.balance(&alice).await, (0, 0));
    assert!(ledger.db.list_pending_orders().await.unwrap().is_empty());
    ledger.cleanup().await;
}

#[tokio::test]
async fn unknown_orders_cannot_be_updated() {
    let ledger = TestLedger::new().await;
    let alice = ledger.user("alice").await;
    let mut order = ledger.order(&alice, 4242).await;
    order.id += 1000;
    let err = ledger.db.apply_accrual_result(&order, AccrualResult::processed(Points::from(1))).await.unwrap_err();
    assert!(matches!(err, LedgerError::OrderIdNotFound(_)));
    ledger.cleanup().await;
}

#[tokio::test]
async fn withdrawing_more_than_the_balance_is_rejected() {
    let ledger = TestLedger::new().await;
    let alice = ledger.user("alice").await;
    ledger.fund(&alice, 100, 300).await;

    let err = ledger.db.create_withdrawal(alice.id, &order_number(2377225624), Points::from(500)).await.unwrap_err();
    match err {
        LedgerError::InsufficientFunds { balance, requested } => {
            assert_eq!(balance, Points::from(300));
            assert_eq!(requested, Points::from(500));
        },
        e => panic!("Expected InsufficientFunds, got {e}"),
    }
    assert_eq!(ledger.balance(&alice).await, (300, 0));
    assert!(ledger.db.fetch_withdrawals_for_user(alice.id).await.unwrap().is_empty());
    ledger.cleanup().await;
}

#[tokio::test]
async fn concurrent_withdrawals_cannot_overdraw() {
    let ledger = TestLedger::new().await;
    let alice = ledger.user("alice").await;
    ledger.fund(&alice, 100, 500).await;

    let amount = Points::from(500);
    let (n1, n2) = (order_number(900_001), order_number(900_002));
    let (a, b) =
        tokio::join!(ledger.db.create_withdrawal(alice.id, &n1, amount), ledger.db.create_withdrawal(alice.id, &n2, amount));
    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().any(|r| matches!(r, Err(LedgerError::InsufficientFunds { .. }))));
    assert_eq!(ledger.balance(&alice).await, (0, 500));
    assert_eq!(ledger.db.fetch_withdrawals_for_user(alice.id).await.unwrap().len(), 1);
    ledger.cleanup().await;
}

#[tokio::test]
async fn duplicate_withdrawal_numbers_roll_back() {
    let ledger = TestLedger::new().await;
    let alice = ledger.user("alice").await;
    ledger.fund(&alice, 100, 1000).await;
    let number = order_number(31337);
    ledger.db.create_withdrawal(alice.id, &number, Points::from(100)).await.unwrap();
    let err = ledger.db.create_withdrawal(alice.id, &number, Points::from(100)).await.unwrap_err();
    assert!(matches!(err, LedgerError::WithdrawalAlreadyExists(n) if n == number));
    // The debit of the failed withdrawal must not survive
    assert_eq!(ledger.balance(&alice).await, (900, 100));
    ledger.cleanup().await;
}

#[tokio::test]
async fn balance_is_conserved() {
    let ledger = TestLedger::new().await;
    let alice = ledger.user("alice").await;
    let mut accrued = 0;
    let mut withdrawn = 0;
    let steps: [(bool, i64); 8] =
        [(true, 1000), (false, 250), (true, 75), (false, 800), (false, 100), (true, 5), (false, 30), (false, 1)];
    for (i, (is_accrual, amount)) in steps.into_iter().enumerate() {
        let seed = 10_000 + i as u64;
        if is_accrual {
            ledger.fund(&alice, seed, amount).await;
            accrued += amount;
        } else {
            match ledger.db.create_withdrawal(alice.id, &order_number(seed), Points::from(amount)).await {
                Ok(w) => {
                    assert_eq!(w.amount, Points::from(amount));
                    withdrawn += amount;
                },
                Err(LedgerError::InsufficientFunds { .. }) => {},
                Err(e) => panic!("Unexpected error: {e}"),
            }
        }
        assert_eq!(ledger.balance(&alice).await, (accrued - withdrawn, withdrawn), "after step {i}");
    }
    // 1080 accrued, 250 + 800 + 30 withdrawn; 100 and 1 would have overdrawn at the time
    assert_eq!(ledger.balance(&alice).await, (0, 1080));
    let total: Points = ledger.db.fetch_withdrawals_for_user(alice.id).await.unwrap().iter().map(|w| w.amount).sum();
    assert_eq!(total, Points::from(withdrawn));
    ledger.cleanup().await;
}

#[tokio::test]
async fn orders_are_created_exactly_once() {
    let ledger = TestLedger::new().await;
    let alice = ledger.user("alice").await;
    let bob = ledger.user("bob").await;
    let number = order_number(7992739871);

    let (a, b) =
        tokio::join!(ledger.db.get_or_create_order(alice.id, &number), ledger.db.get_or_create_order(bob.id, &number));
    let (order_a, created_a) = a.unwrap();
    let (order_b, created_b) = b.unwrap();
    assert!(created_a ^ created_b, "Exactly one submission should create the order");
    assert_eq!(order_a, order_b);

    let (again, created) = ledger.db.get_or_create_order(alice.id, &number).await.unwrap();
    assert!(!created);
    assert_eq!(again.id, order_a.id);
    let total = ledger.db.fetch_orders_for_user(alice.id).await.unwrap().len()
        + ledger.db.fetch_orders_for_user(bob.id).await.unwrap().len();
    assert_eq!(total, 1);
    ledger.cleanup().await;
}

#[tokio::test]
async fn duplicate_logins_conflict() {
    let ledger = TestLedger::new().await;
    ledger.user("alice").await;
    let err = ledger.db.create_user("alice", "other").await.unwrap_err();
    assert!(matches!(err, LedgerError::LoginAlreadyExists(login) if login == "alice"));
    assert!(ledger.db.fetch_user_by_login("alice").await.unwrap().is_some());
    assert!(ledger.db.fetch_user_by_login("carol").await.unwrap().is_none());
    ledger.cleanup().await;
}

#[tokio::test]
async fn pending_partitions_cover_every_pending_order() {
    let ledger = TestLedger::new().await;
    let alice = ledger.user("alice").await;
    let mut orders = vec![];
    for seed in 1..=10 {
        orders.push(ledger.order(&alice, seed * 11).await);
    }
    ledger.db.apply_accrual_result(&orders[2], AccrualResult::processed(Points::from(1))).await.unwrap();
    ledger.db.apply_accrual_result(&orders[5], AccrualResult::invalid()).await.unwrap();
    ledger.db.apply_accrual_result(&orders[7], AccrualResult::processing()).await.unwrap();

    let mut pending = ledger.db.list_pending_orders().await.unwrap().into_iter().map(|o| o.id).collect::<Vec<_>>();
    pending.sort();
    assert_eq!(pending.len(), 8);

    let mut seen = vec![];
    for partition in Partition::split(3, 100) {
        let slice = ledger.db.fetch_pending_partition(partition).await.unwrap();
        assert!(slice.iter().all(|o| partition.contains(o.id)));
        assert!(slice.windows(2).all(|w| w[0].id < w[1].id));
        seen.extend(slice.into_iter().map(|o| o.id));
    }
    seen.sort();
    assert_eq!(seen, pending);

    let limited = ledger.db.fetch_pending_partition(Partition::everything(3)).await.unwrap();
    assert_eq!(limited.iter().map(|o| o.id).collect::<Vec<_>>(), pending[..3].to_vec());

    // Paging with the cursor walks the rest of the pending set, then runs dry
    let next = ledger.db.fetch_pending_partition(Partition::everything(3).starting_after(pending[2])).await.unwrap();
    assert_eq!(next.iter().map(|o| o.id).collect::<Vec<_>>(), pending[3..6].to_vec());
    let last = ledger.db.fetch_pending_partition(Partition::everything(3).starting_after(pending[5])).await.unwrap();
    assert_eq!(last.iter().map(|o| o.id).collect::<Vec<_>>(), pending[6..].to_vec());
    let done = ledger.db.fetch_pending_partition(Partition::everything(3).starting_after(pending[7])).await.unwrap();
    assert!(done.is_empty());
    ledger.cleanup().await;
}

#[tokio::test]
async fn account_history_ordering() {
    let ledger = TestLedger::new().await;
    let alice = ledger.user("alice").await;
    let first = ledger.order(&alice, 1).await;
    let second = ledger.order(&alice, 2).await;
    let third = ledger.order(&alice, 3).await;
    let orders = ledger.db.fetch_orders_for_user(alice.id).await.unwrap();
    assert_eq!(orders.iter().map(|o| o.id).collect::<Vec<_>>(), vec![third.id, second.id, first.id]);

    ledger.db.apply_accrual_result(&first, AccrualResult::processed(Points::from(1000))).await.unwrap();
    for seed in [20, 21, 22] {
        ledger.db.create_withdrawal(alice.id, &order_number(seed), Points::from(10)).await.unwrap();
    }
    let withdrawals = ledger.db.fetch_withdrawals_for_user(alice.id).await.unwrap();
    let numbers = withdrawals.iter().map(|w| w.number.clone()).collect::<Vec<_>>();
    assert_eq!(numbers, vec![order_number(20), order_number(21), order_number(22)]);
    assert_eq!(ledger.balance(&alice).await, (970, 30));
    ledger.cleanup().await;
}
