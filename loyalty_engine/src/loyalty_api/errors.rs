use thiserror::Error;

use crate::{
    db_types::{OrderNumberError, Points},
    traits::{AccountApiError, LedgerError},
};

/// Errors surfaced by the public APIs, grouped the way an inbound request handler needs to tell them apart.
#[derive(Debug, Clone, Error)]
pub enum LoyaltyApiError {
    /// The request itself is malformed. Nothing was changed.
    #[error("Invalid request. {0}")]
    Validation(String),
    /// The request clashes with existing data, e.g. a taken login or someone else's order.
    #[error("Conflict. {0}")]
    Conflict(String),
    #[error("Insufficient funds. Requested {requested}, but the balance is {balance}")]
    InsufficientFunds { balance: Points, requested: Points },
    #[error("Not found. {0}")]
    NotFound(String),
    #[error("Backend error. {0}")]
    Backend(String),
}

impl From<OrderNumberError> for LoyaltyApiError {
    fn from(e: OrderNumberError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<AccountApiError> for LoyaltyApiError {
    fn from(e: AccountApiError) -> Self {
        Self::Backend(e.to_string())
    }
}

impl From<LedgerError> for LoyaltyApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::LoginAlreadyExists(_)
            | LedgerError::OrderOwnedByAnotherUser(_)
            | LedgerError::WithdrawalAlreadyExists(_) => Self::Conflict(e.to_string()),
            LedgerError::InsufficientFunds { balance, requested } => Self::InsufficientFunds { balance, requested },
            LedgerError::UserNotFound(_) | LedgerError::OrderIdNotFound(_) => Self::NotFound(e.to_string()),
            LedgerError::DatabaseError(_) => Self::Backend(e.to_string()),
        }
    }
}

/// The only way a reconciliation cycle can fail. Everything else is logged and retried on the next cycle.
#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("The ledger store is unavailable. {0}")]
    StoreUnavailable(#[from] LedgerError),
}
