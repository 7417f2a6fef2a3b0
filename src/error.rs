//! Error types and handling for the swellcast library

use thiserror::Error;

/// Main error type for swellcast
#[derive(Error, Debug)]
pub enum SwellcastError {
    /// Configuration-related errors (bad config file, unknown spot)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Upstream provider unavailable: non-200, empty body or timeout after retries
    #[error("Fetch error: {message}")]
    Fetch { message: String },

    /// Malformed upstream payload
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Record (de)serialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Requested entity does not exist
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl SwellcastError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new fetch error
    pub fn fetch<S: Into<String>>(message: S) -> Self {
        Self::Fetch {
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Whether retrying later could succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, SwellcastError::Fetch { .. })
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            SwellcastError::Config { .. } => {
                "Configuration error. Please check your config file and spot list.".to_string()
            }
            SwellcastError::Fetch { .. } => {
                "Unable to reach NOAA data services. Please try again shortly.".to_string()
            }
            SwellcastError::Parse { message } => {
                format!("Upstream data could not be read: {message}")
            }
            SwellcastError::Serialization { message } => {
                format!("Record could not be encoded: {message}")
            }
            SwellcastError::NotFound { message } => format!("Not found: {message}"),
            SwellcastError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

impl From<serde_json::Error> for SwellcastError {
    fn from(err: serde_json::Error) -> Self {
        SwellcastError::serialization(err.to_string())
    }
}

impl From<reqwest_middleware::Error> for SwellcastError {
    fn from(err: reqwest_middleware::Error) -> Self {
        SwellcastError::fetch(err.to_string())
    }
}

impl From<reqwest::Error> for SwellcastError {
    fn from(err: reqwest::Error) -> Self {
        SwellcastError::fetch(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = SwellcastError::config("unknown spot");
        assert!(matches!(config_err, SwellcastError::Config { .. }));

        let fetch_err = SwellcastError::fetch("timeout");
        assert!(matches!(fetch_err, SwellcastError::Fetch { .. }));
        assert!(fetch_err.is_transient());

        let parse_err = SwellcastError::parse("bad header");
        assert!(!parse_err.is_transient());
    }

    #[test]
    fn test_user_messages() {
        let config_err = SwellcastError::config("test");
        assert!(config_err.user_message().contains("Configuration error"));

        let fetch_err = SwellcastError::fetch("test");
        assert!(fetch_err.user_message().contains("Unable to reach"));

        let parse_err = SwellcastError::parse("column count");
        assert!(parse_err.user_message().contains("column count"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SwellcastError = io_err.into();
        assert!(matches!(err, SwellcastError::Io { .. }));
    }
}
