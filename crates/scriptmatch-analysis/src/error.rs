use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no API key configured for the analysis provider")]
    MissingCredentials,
    #[error("analysis request failed: {message}")]
    Http { message: String },
    #[error("analysis request timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("analysis response was malformed: {message}")]
    Malformed { message: String },
}

impl AnalysisError {
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}
