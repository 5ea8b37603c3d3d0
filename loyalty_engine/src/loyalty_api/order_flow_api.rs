use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Order, OrderNumber},
    loyalty_api::errors::LoyaltyApiError,
    traits::{LedgerError, LedgerStore},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOrderResult {
    /// The order is new and will be picked up by the next reconciliation cycle.
    Accepted(Order),
    /// The same user has submitted this order before. Nothing changed.
    AlreadySubmitted(Order),
}

impl SubmitOrderResult {
    pub fn order(&self) -> &Order {
        match self {
            Self::Accepted(o) | Self::AlreadySubmitted(o) => o,
        }
    }
}

/// `OrderFlowApi` accepts order numbers from users and hands them to the ledger for reconciliation.
pub struct OrderFlowApi<B> {
    db: B,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

impl<B> OrderFlowApi<B>
where B: LedgerStore
{
    /// Submit an order number on behalf of a user.
    ///
    /// The raw text is trimmed and must be a Luhn-valid number. Submitting the same number twice is harmless. If a
    /// different user already owns the number, a [`LoyaltyApiError::Conflict`] is returned and nothing changes.
    pub async fn submit_order(&self, user_id: i64, raw_number: &str) -> Result<SubmitOrderResult, LoyaltyApiError> {
        let number = OrderNumber::parse(raw_number)?;
        let (order, created) = self.db.get_or_create_order(user_id, &number).await?;
        match (created, order.user_id == user_id) {
            (true, _) => {
                info!("📦️ Order [{number}] accepted for user #{user_id}");
                Ok(SubmitOrderResult::Accepted(order))
            },
            (false, true) => {
                debug!("📦️ Order [{number}] was already submitted by user #{user_id}");
                Ok(SubmitOrderResult::AlreadySubmitted(order))
            },
            (false, false) => {
                debug!("📦️ User #{user_id} tried to submit order [{number}], which belongs to user #{}", order.user_id);
                Err(LedgerError::OrderOwnedByAnotherUser(number).into())
            },
        }
    }

    pub async fn fetch_order(&self, raw_number: &str) -> Result<Option<Order>, LoyaltyApiError> {
        let number = OrderNumber::parse(raw_number)?;
        let order = self.db.fetch_order_by_number(&number).await?;
        Ok(order)
    }
}
