//! Error types for rate fetching and conversion.

use thiserror::Error;

/// Failure to obtain a usable rate table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// The request never produced a response (connection failure, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// The response body was malformed or carried unusable rates.
    #[error("Failed to parse rate response: {0}")]
    Parse(String),

    /// The rate service answered with a non-success status.
    #[error("Rate service error: {0}")]
    Server(String),
}

impl FetchError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Network(_) | FetchError::Server(_))
    }
}

/// Reasons an edit could not be converted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("No rate available for {0}")]
    MissingRate(String),

    #[error("Invalid rate {rate} for {code}")]
    InvalidRate { code: String, rate: f64 },

    #[error("Currency {0} is not tracked by this form")]
    UnknownCurrency(String),

    #[error("Converted amount for {0} is out of range")]
    AmountOutOfRange(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(FetchError::Network("timeout".to_string()).is_transient());
        assert!(FetchError::Server("503 Service Unavailable".to_string()).is_transient());
        assert!(!FetchError::Parse("missing field `rates`".to_string()).is_transient());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ConversionError::MissingRate("JPY".to_string()).to_string(),
            "No rate available for JPY"
        );
        assert_eq!(
            FetchError::Server("500 Internal Server Error".to_string()).to_string(),
            "Rate service error: 500 Internal Server Error"
        );
    }
}
