use thiserror::Error;

/// Main error type for the admin analytics service
#[derive(Error, Debug)]
pub enum DashError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Subgraph error: {0}")]
    Subgraph(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Address parsing error: {0}")]
    AddressParsing(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for DashError
pub type Result<T> = std::result::Result<T, DashError>;

impl DashError {
    /// True for errors caused by the caller's input rather than a dependency
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::AddressParsing(_) | Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(DashError::AddressParsing("0xzz".into()).is_client_error());
        assert!(DashError::Validation("bad".into()).is_client_error());
        assert!(!DashError::Rpc("timeout".into()).is_client_error());
        assert!(!DashError::Internal("boom".into()).is_client_error());
    }

    #[test]
    fn test_error_messages() {
        let err = DashError::Subgraph("HTTP 502".into());
        assert_eq!(err.to_string(), "Subgraph error: HTTP 502");
    }
}
