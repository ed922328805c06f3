use thiserror::Error;

// Main Classifier Error Type

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Provider '{provider}' unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },
    #[error("Provider '{provider}' returned a malformed response: {reason}")]
    ProviderMalformedResponse { provider: String, reason: String },
    #[error("Monthly usage quota of {limit} calls exhausted for period {period}")]
    QuotaExceeded { period: String, limit: u32 },
    #[error("Unsupported input format: {0}")]
    UnsupportedInputFormat(String),
    #[error("Usage store error: {0}")]
    Store(#[from] QuotaStoreError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to load configuration: {0}")]
    ConfigLoad(#[from] config::ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize result: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClassifierError {
    pub fn unavailable(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProviderMalformedResponse {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Terminal errors abort the whole classification; everything else is
    /// recovered by the stage or provider call that produced it.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            ClassifierError::ProviderUnavailable { .. }
                | ClassifierError::ProviderMalformedResponse { .. }
        )
    }
}

// Usage Store Error Type
#[derive(Error, Debug)]
pub enum QuotaStoreError {
    #[error("Failed to access usage file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to (de)serialize usage counter: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Usage store is unavailable: {0}")]
    Unavailable(String),
}
