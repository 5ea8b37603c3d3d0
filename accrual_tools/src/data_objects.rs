use std::{fmt::Display, time::Duration};

use loyalty_common::{Points, PointsConversionError};
use serde::{Deserialize, Serialize};

/// The accrual service's own vocabulary for the state of an order calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccrualStatus {
    /// The order is known, but the calculation has not started.
    Registered,
    Processing,
    /// The order will not earn any points.
    Invalid,
    /// The calculation is complete.
    Processed,
}

impl Display for AccrualStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccrualStatus::Registered => write!(f, "REGISTERED"),
            AccrualStatus::Processing => write!(f, "PROCESSING"),
            AccrualStatus::Invalid => write!(f, "INVALID"),
            AccrualStatus::Processed => write!(f, "PROCESSED"),
        }
    }
}

/// Body of a `200 OK` response from `GET /api/orders/{number}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualResponse {
    pub order: String,
    pub status: AccrualStatus,
    /// Decimal amount of points. Only present once the order is `PROCESSED`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<f64>,
}

impl AccrualResponse {
    /// The accrual in minor units. A missing accrual counts as zero.
    pub fn accrual_points(&self) -> Result<Points, PointsConversionError> {
        self.accrual.map(Points::from_decimal).transpose().map(Option::unwrap_or_default)
    }
}

/// Every successful round trip to the accrual service ends up as one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum AccrualLookup {
    Registered(AccrualResponse),
    /// `204 No Content`: the service has not heard of this order (yet).
    NotRegistered,
    /// `429 Too Many Requests`: do not call again before `retry_after` has elapsed.
    Throttled { retry_after: Duration },
}
