use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccrualApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid accrual service address. {0}")]
    InvalidUrl(String),
    #[error("Request to the accrual service failed: {0}")]
    RestRequestError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The accrual service throttled the request without a usable Retry-After header. {0}")]
    InvalidRetryAfter(String),
}

impl AccrualApiError {
    /// A throttled response that cannot be honoured is unrecoverable for that request. Everything else a lookup can
    /// fail with is worth trying again on the next pass.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidRetryAfter(_))
    }
}
