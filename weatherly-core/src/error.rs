use std::time::Duration;

use thiserror::Error;

/// Errors produced by the query pipeline, the stores and the scene engine.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// Empty or malformed user input; blocks the query before any request.
    #[error("{0}")]
    InvalidInput(String),

    #[error("City not found: {0}")]
    LocationNotFound(String),

    #[error("Weather request failed: {0}")]
    NetworkFailure(String),

    #[error("Failed to fetch forecast data: {0}")]
    ForecastUnavailable(String),

    #[error("Weather request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Local storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Contained inside the scene engine, never shown to the user.
    #[error("Failed to build weather animation: {0}")]
    AnimationFailure(String),
}

impl WeatherError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    /// Whether the failure came from the network side of a query.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::LocationNotFound(_)
                | Self::NetworkFailure(_)
                | Self::ForecastUnavailable(_)
                | Self::Timeout(_)
        )
    }
}

pub type Result<T, E = WeatherError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_reports_seconds() {
        let err = WeatherError::Timeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "Weather request timed out after 10s");
    }

    #[test]
    fn remote_errors_are_flagged() {
        assert!(WeatherError::LocationNotFound("x".into()).is_remote());
        assert!(WeatherError::ForecastUnavailable("x".into()).is_remote());
        assert!(!WeatherError::invalid_input("x").is_remote());
        assert!(!WeatherError::storage("x").is_remote());
    }
}
