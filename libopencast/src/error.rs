//! Error types for OpenCast

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OpenCastError>;

#[derive(Error, Debug)]
pub enum OpenCastError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Content validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Generation exhausted after {attempts} attempt(s): {last_failure}")]
    GenerationExhausted {
        attempts: u32,
        last_failure: AttemptFailure,
    },

    #[error("Generation deadline exceeded after {attempts} attempt(s)")]
    DeadlineExceeded {
        attempts: u32,
        last_failure: Option<AttemptFailure>,
    },

    #[error("Generation service error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Publishing failed: {0}")]
    Publish(#[from] PublishError),

    #[error("Category store I/O error: {0}")]
    StoreIo(#[from] std::io::Error),

    #[error("Invalid category data: {0}")]
    InvalidData(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl OpenCastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            OpenCastError::NotFound(_) => 4,
            OpenCastError::Validation(_) => 3,
            OpenCastError::Generation(GenerationError::Authentication(_)) => 2,
            OpenCastError::Generation(_) => 5,
            OpenCastError::GenerationExhausted { .. } => 5,
            OpenCastError::DeadlineExceeded { .. } => 5,
            OpenCastError::Publish(PublishError::AuthFailure(_)) => 2,
            OpenCastError::Publish(_) => 1,
            OpenCastError::StoreIo(_) => 1,
            OpenCastError::InvalidData(_) => 1,
            OpenCastError::Config(_) => 1,
        }
    }
}

/// A rule violated by generated text, in the order the validator checks them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Content is empty")]
    Empty,

    #[error("Content too short: {length} characters (minimum {min})")]
    TooShort { length: usize, min: usize },

    #[error("Content too long: {length} characters (maximum {max})")]
    TooLong { length: usize, max: usize },

    #[error("Expected {expected} hashtag(s), found {found}")]
    WrongHashtagCount { expected: usize, found: usize },
}

/// Why a single generation attempt was not accepted
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AttemptFailure {
    #[error("{0}")]
    Validation(ValidationError),

    #[error("Content duplicates an existing entry")]
    Duplicate,

    #[error("{0}")]
    Service(GenerationError),
}

/// Failures reported by the completion service boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Completion service returned no content")]
    EmptyResponse,
}

impl GenerationError {
    /// Transient errors are worth another attempt; permanent ones are not.
    pub fn is_transient(&self) -> bool {
        match self {
            GenerationError::RateLimited(_)
            | GenerationError::Server(_)
            | GenerationError::Network(_)
            | GenerationError::Timeout(_)
            | GenerationError::EmptyResponse => true,
            GenerationError::Authentication(_) | GenerationError::MalformedRequest(_) => false,
        }
    }
}

/// Channel rejections, shared by every publisher
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PublishError {
    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    #[error("Rate limit exceeded: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("Payload rejected: {0}")]
    PayloadRejected(String),

    #[error("Network error: {0}")]
    TransientNetworkError(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    Invalid(String),
}
