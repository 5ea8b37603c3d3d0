use loyalty_engine::{LedgerError, ReconciliationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize the server. {0}")]
    InitializeError(String),
    #[error("Invalid configuration. {0}")]
    ConfigurationError(String),
    #[error("The ledger backend reported an error. {0}")]
    BackendError(#[from] LedgerError),
    #[error("Accrual reconciliation stopped. {0}")]
    ReconciliationError(#[from] ReconciliationError),
}
