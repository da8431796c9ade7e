use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// All errors generated while sourcing live ticks and historical bars from an upstream venue.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Error)]
pub enum DataError {
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("SocketError: {0}")]
    Socket(String),

    #[error("upstream stream closed: {0}")]
    StreamClosed(String),

    #[error("no upstream message within {0:?}")]
    ReadTimeout(Duration),
}

impl DataError {
    /// Determine if an error requires the current upstream connection to be dropped and
    /// re-established.
    ///
    /// A single malformed message is dropped in place; everything else means the connection can
    /// no longer be trusted to deliver ticks.
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_terminal(&self) -> bool {
        match self {
            DataError::MalformedMessage(_) => false,
            _ => true,
        }
    }
}

impl From<reqwest::Error> for DataError {
    fn from(value: reqwest::Error) -> Self {
        Self::UpstreamUnavailable(value.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for DataError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Socket(value.to_string())
    }
}

impl From<url::ParseError> for DataError {
    fn from(value: url::ParseError) -> Self {
        Self::UpstreamUnavailable(format!("invalid upstream url: {value}"))
    }
}

impl From<serde_json::Error> for DataError {
    fn from(value: serde_json::Error) -> Self {
        Self::MalformedMessage(value.to_string())
    }
}

/// Errors surfaced to callers of on-demand analytics queries.
///
/// Note that "not enough aligned history yet" for live pair analytics is a normal result
/// ([`PairAnalytics::Warming`](crate::analytics::pairs::PairAnalytics)), not an error.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Error)]
pub enum AnalyticsError {
    #[error("insufficient data: {available} aligned observations, at least {required} required")]
    InsufficientData { available: usize, required: usize },

    #[error("insufficient variance: {0}")]
    InsufficientVariance(String),
}

/// Errors generated while serialising a store snapshot for offline analysis.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum ExportError {
    #[error("failed to write csv export: {0}")]
    Csv(String),

    #[error("failed to write json export: {0}")]
    Json(String),
}

impl From<csv::Error> for ExportError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value.to_string())
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_error_is_terminal() {
        struct TestCase {
            input: DataError,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: is not terminal w/ DataError::MalformedMessage
                input: DataError::MalformedMessage("missing field `p`".to_string()),
                expected: false,
            },
            TestCase {
                // TC1: is terminal w/ DataError::Socket
                input: DataError::Socket("WebSocket protocol error: Connection reset".to_string()),
                expected: true,
            },
            TestCase {
                // TC2: is terminal w/ DataError::StreamClosed
                input: DataError::StreamClosed("close frame received".to_string()),
                expected: true,
            },
            TestCase {
                // TC3: is terminal w/ DataError::UpstreamUnavailable
                input: DataError::UpstreamUnavailable("connection refused".to_string()),
                expected: true,
            },
            TestCase {
                // TC4: is terminal w/ DataError::ReadTimeout
                input: DataError::ReadTimeout(Duration::from_secs(120)),
                expected: true,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.is_terminal();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_serde_json_error_is_malformed_message() {
        let error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(matches!(DataError::from(error), DataError::MalformedMessage(_)));
    }

    #[test]
    fn test_analytics_error_display() {
        let error = AnalyticsError::InsufficientData {
            available: 3,
            required: 4,
        };
        assert_eq!(
            error.to_string(),
            "insufficient data: 3 aligned observations, at least 4 required"
        );
    }
}
