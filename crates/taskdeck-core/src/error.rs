use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskdeckError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl TaskdeckError {
    /// Returns `true` when the error comes from talking to the external
    /// agent (network failure or an error status from the service).
    pub fn is_agent_failure(&self) -> bool {
        matches!(self, Self::Agent(_) | Self::Http(_))
    }
}

pub type Result<T> = std::result::Result<T, TaskdeckError>;
