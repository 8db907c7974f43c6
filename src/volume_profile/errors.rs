use thiserror::Error;

/// Precondition violations rejected before any profile work starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProfileError {
    #[error("Invalid tick size: {0} (must be positive and finite)")]
    InvalidTickSize(f64),
    #[error("Invalid row count: {0} (must be at least 1)")]
    InvalidRowCount(u32),
    #[error("Invalid row size: {0} (must be positive and finite)")]
    InvalidRowSize(f64),
    #[error("Invalid value area percentage: {0} (must be in (0, 1])")]
    InvalidValueAreaPercentage(f64),
    #[error("Invalid price range: high={high}, low={low}")]
    InvalidPriceRange { high: f64, low: f64 },
    #[error("Invalid segment budget: {0}")]
    InvalidSegmentBudget(String),
    #[error("Invalid resolution ladder: {0}")]
    InvalidResolutionLadder(String),
    #[error("Invalid UTC offset: {0} minutes")]
    InvalidUtcOffset(i32),
    #[error("Timestamp {0} is outside the supported calendar range")]
    InvalidTimestamp(i64),
}
