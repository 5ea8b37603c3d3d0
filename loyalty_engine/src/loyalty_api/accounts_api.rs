//! Unifies API for accessing user accounts: registration, balances and withdrawals.

use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Balance, Order, OrderNumber, Points, User, Withdrawal},
    loyalty_api::errors::LoyaltyApiError,
    traits::LedgerStore,
};

/// The `AccountApi` provides a unified API for accessing accounts.
pub struct AccountApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B> AccountApi<B>
where B: LedgerStore
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// Registers a new user. The password must already be hashed; this API never sees plain-text passwords.
    pub async fn register(&self, login: &str, password_hash: &str) -> Result<User, LoyaltyApiError> {
        let login = login.trim();
        if login.is_empty() {
            return Err(LoyaltyApiError::Validation("The login cannot be empty".into()));
        }
        if password_hash.is_empty() {
            return Err(LoyaltyApiError::Validation("The password cannot be empty".into()));
        }
        let user = self.db.create_user(login, password_hash).await?;
        info!("👤️ New user registered: '{login}' (#{})", user.id);
        Ok(user)
    }

    pub async fn user_by_login(&self, login: &str) -> Result<Option<User>, LoyaltyApiError> {
        let user = self.db.fetch_user_by_login(login.trim()).await?;
        Ok(user)
    }

    pub async fn balance(&self, user_id: i64) -> Result<Balance, LoyaltyApiError> {
        self.db
            .fetch_balance(user_id)
            .await?
            .ok_or_else(|| LoyaltyApiError::NotFound(format!("User #{user_id} does not exist")))
    }

    /// Withdraws `amount` points from the user's balance against the given order number.
    pub async fn withdraw(&self, user_id: i64, raw_number: &str, amount: Points) -> Result<Withdrawal, LoyaltyApiError> {
        let number = OrderNumber::parse(raw_number)?;
        if !amount.is_positive() {
            return Err(LoyaltyApiError::Validation(format!("Cannot withdraw {amount} points")));
        }
        let withdrawal = self.db.create_withdrawal(user_id, &number, amount).await.map_err(|e| {
            debug!("👤️ Withdrawal of {amount} by user #{user_id} rejected. {e}");
            LoyaltyApiError::from(e)
        })?;
        info!("👤️ User #{user_id} withdrew {amount} points against order [{number}]");
        Ok(withdrawal)
    }

    /// Oldest first
    pub async fn withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>, LoyaltyApiError> {
        let withdrawals = self.db.fetch_withdrawals_for_user(user_id).await?;
        trace!("👤️ User #{user_id} has {} withdrawals", withdrawals.len());
        Ok(withdrawals)
    }

    /// Newest first
    pub async fn orders(&self, user_id: i64) -> Result<Vec<Order>, LoyaltyApiError> {
        let orders = self.db.fetch_orders_for_user(user_id).await?;
        Ok(orders)
    }
}
