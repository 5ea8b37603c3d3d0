use std::time::Duration;

use reqwest::header::HeaderValue;

use crate::AccrualApiError;

/// Parses a `Retry-After` header expressed in whole seconds.
///
/// The HTTP-date form is not used by the accrual service and is treated as invalid.
pub fn parse_retry_after(value: Option<&HeaderValue>) -> Result<Duration, AccrualApiError> {
    let value = value.ok_or_else(|| AccrualApiError::InvalidRetryAfter("Retry-After header is missing".into()))?;
    let text = value
        .to_str()
        .map_err(|e| AccrualApiError::InvalidRetryAfter(format!("Retry-After is not valid text. {e}")))?;
    text.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| AccrualApiError::InvalidRetryAfter(format!("Retry-After value '{text}' is not a number. {e}")))
}
