use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use loyalty_common::Points;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

use crate::helpers::luhn;

//--------------------------------------     OrderNumber       ---------------------------------------------------------

/// An externally supplied order number. Always a non-empty string of digits with a valid Luhn check digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderNumberError {
    #[error("The order number is empty")]
    Empty,
    #[error("The order number '{0}' contains characters other than digits")]
    NotNumeric(String),
    #[error("The order number '{0}' fails the Luhn check")]
    BadChecksum(String),
}

impl OrderNumber {
    /// Validates a raw order number. Leading and trailing whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self, OrderNumberError> {
        let number = raw.trim();
        if number.is_empty() {
            return Err(OrderNumberError::Empty);
        }
        if !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OrderNumberError::NotNumeric(number.to_string()));
        }
        if !luhn::is_valid(number) {
            return Err(OrderNumberError::BadChecksum(number.to_string()));
        }
        Ok(Self(number.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderNumber {
    type Err = OrderNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = OrderNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrderNumber> for String {
    fn from(value: OrderNumber) -> Self {
        value.0
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatusType {
    /// The order has been submitted, but the accrual service has not reported on it yet.
    New,
    /// The accrual service knows about the order and is calculating the reward.
    Processing,
    /// The calculation is complete and the accrual has been credited. Terminal.
    Processed,
    /// The order does not earn any points. Terminal.
    Invalid,
}

impl OrderStatusType {
    pub const TERMINAL: [OrderStatusType; 2] = [OrderStatusType::Processed, OrderStatusType::Invalid];

    pub fn is_terminal(&self) -> bool {
        Self::TERMINAL.contains(self)
    }

    /// The statuses from which an order may move to `target`. Status only ever moves forward, so `New` cannot be
    /// reached from anywhere.
    pub fn sources_for(target: OrderStatusType) -> &'static [OrderStatusType] {
        use OrderStatusType::*;
        match target {
            New => &[],
            Processing => &[New],
            Processed | Invalid => &[New, Processing],
        }
    }

    pub fn can_transition_to(&self, target: OrderStatusType) -> bool {
        Self::sources_for(target).contains(self)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::New => write!(f, "NEW"),
            OrderStatusType::Processing => write!(f, "PROCESSING"),
            OrderStatusType::Processed => write!(f, "PROCESSED"),
            OrderStatusType::Invalid => write!(f, "INVALID"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "PROCESSING" => Ok(Self::Processing),
            "PROCESSED" => Ok(Self::Processed),
            "INVALID" => Ok(Self::Invalid),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------        User           ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub login: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// The current points balance
    pub bonuses: Points,
    /// Running total of all points ever withdrawn
    pub withdrawn: Points,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn balance(&self) -> Balance {
        Balance { current: self.bonuses, withdrawn: self.withdrawn }
    }
}

//--------------------------------------       Balance         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Balance {
    #[sqlx(rename = "bonuses")]
    pub current: Points,
    pub withdrawn: Points,
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Order {
    pub id: i64,
    pub number: OrderNumber,
    pub user_id: i64,
    pub status: OrderStatusType,
    /// Points awarded by the accrual service. Zero until the order is `PROCESSED`.
    pub accrual: Points,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      Withdrawal       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Withdrawal {
    pub id: i64,
    pub number: OrderNumber,
    pub user_id: i64,
    #[sqlx(rename = "withdrawn")]
    pub amount: Points,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------    AccrualResult      ---------------------------------------------------------

/// The state of an order as reported by the accrual service, already translated into our own status vocabulary.
///
/// Only a `Processed` result carries an accrual. Constructing any other result discards the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccrualResult {
    status: OrderStatusType,
    accrual: Points,
}

impl AccrualResult {
    pub fn new(status: OrderStatusType, accrual: Points) -> Self {
        let accrual = if status == OrderStatusType::Processed { accrual } else { Points::default() };
        Self { status, accrual }
    }

    pub fn processing() -> Self {
        Self::new(OrderStatusType::Processing, Points::default())
    }

    pub fn processed(accrual: Points) -> Self {
        Self::new(OrderStatusType::Processed, accrual)
    }

    pub fn invalid() -> Self {
        Self::new(OrderStatusType::Invalid, Points::default())
    }

    pub fn status(&self) -> OrderStatusType {
        self.status
    }

    pub fn accrual(&self) -> Points {
        self.accrual
    }
}
