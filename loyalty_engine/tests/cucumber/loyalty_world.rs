use std::{collections::HashMap, time::Duration};

use cucumber::World;
use log::*;
use loyalty_engine::{
    db_types::{User, Withdrawal},
    test_utils::{
        accrual_stub::ScriptedAccrualSource,
        prepare_env::{prepare_test_env, random_db_path, remove_database},
    },
    AccountApi,
    AccrualFlowApi,
    CycleSummary,
    LedgerStore,
    LoyaltyApiError,
    OrderFlowApi,
    ReconciliationOptions,
    SqliteDatabase,
    SubmitOrderResult,
};

#[derive(Default, Debug, World)]
pub struct LoyaltyWorld {
    pub system: Option<LoyaltySystem>,
}

#[derive(Debug)]
pub struct LoyaltySystem {
    pub db_path: String,
    pub accounts: AccountApi<SqliteDatabase>,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub accrual: AccrualFlowApi<SqliteDatabase, ScriptedAccrualSource>,
    pub users: HashMap<String, User>,
    pub last_submission: Option<Result<SubmitOrderResult, LoyaltyApiError>>,
    pub last_withdrawal: Option<Result<Withdrawal, LoyaltyApiError>>,
    pub last_cycle: Option<(CycleSummary, Duration)>,
}

impl LoyaltyWorld {
    pub fn system(&mut self) -> &mut LoyaltySystem {
        self.system.as_mut().expect("System not initialised")
    }
}

impl LoyaltySystem {
    pub async fn new() -> Self {
        let db_path = random_db_path();
        let db = prepare_test_env(&db_path).await;
        debug!("Created database: {db_path}");
        let options = ReconciliationOptions::new(4, 100);
        Self {
            db_path,
            accounts: AccountApi::new(db.clone()),
            orders: OrderFlowApi::new(db.clone()),
            accrual: AccrualFlowApi::new(db, ScriptedAccrualSource::new(), options),
            users: HashMap::new(),
            last_submission: None,
            last_withdrawal: None,
            last_cycle: None,
        }
    }

    pub fn user(&self, login: &str) -> &User {
        self.users.get(login).unwrap_or_else(|| panic!("User '{login}' has not been registered"))
    }

    /// Closes the pool and deletes the scenario's database file.
    pub async fn tear_down(&mut self) {
        if let Err(e) = self.accrual.db_mut().close().await {
            error!("🚀️ Could not close {}. {e}", self.db_path);
        }
        remove_database(&self.db_path).await;
        debug!("🚀️ Removed {}", self.db_path);
    }
}
