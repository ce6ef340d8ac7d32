//! Stream error types.
//!
//! The framework is the sole retry authority: processors re-raise failures
//! as `StreamError::Processing` and the worker decides between redelivery
//! and dead-lettering based on the delivery count.

use thiserror::Error;

/// Stream processing errors
#[derive(Error, Debug)]
pub enum StreamError {
    /// Redis connection or command error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Job processing failed
    #[error("Processing error: {0}")]
    Processing(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StreamError {
    /// Check whether the consumer group vanished and must be recreated.
    pub fn is_nogroup_error(&self) -> bool {
        matches!(self, StreamError::Redis(e) if e.to_string().contains("NOGROUP"))
    }

    /// Check whether this is a Redis connection-level error worth backing
    /// off for rather than logging as a processing failure.
    pub fn is_connection_error(&self) -> bool {
        let StreamError::Redis(e) = self else {
            return false;
        };
        let lower = e.to_string().to_lowercase();
        lower.contains("connection")
            || lower.contains("disconnected")
            || lower.contains("broken pipe")
            || lower.contains("reset by peer")
            || lower.contains("refused")
            || lower.contains("timed out")
            || lower.contains("eof")
            || lower.contains("io error")
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nogroup_detection() {
        let err = StreamError::Redis(redis::RedisError::from((
            redis::ErrorKind::Extension,
            "An error was signalled by the server",
            "NOGROUP No such consumer group".to_string(),
        )));
        assert!(err.is_nogroup_error());
        assert!(!err.is_connection_error());
    }

    #[test]
    fn test_connection_error_detection() {
        let err = StreamError::Redis(redis::RedisError::from((
            redis::ErrorKind::Io,
            "io error",
            "Connection refused".to_string(),
        )));
        assert!(err.is_connection_error());
        assert!(!err.is_nogroup_error());
    }

    #[test]
    fn test_processing_error_is_neither() {
        let err = StreamError::Processing("send failed".to_string());
        assert!(!err.is_connection_error());
        assert!(!err.is_nogroup_error());
        assert_eq!(err.to_string(), "Processing error: send failed");
    }

    #[test]
    fn test_serde_error_conversion() {
        let serde_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: StreamError = serde_err.into();
        assert!(matches!(err, StreamError::Serialization(_)));
    }
}
