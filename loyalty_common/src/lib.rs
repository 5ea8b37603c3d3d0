pub mod helpers;
mod points;
pub mod op;

pub use points::{Points, PointsConversionError, MINOR_UNITS_PER_POINT};
