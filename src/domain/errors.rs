use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("could not decode image: {0}")]
    Decode(String),
    #[error("could not load model: {0}")]
    ModelLoad(String),
    #[error("operation failed: {0}")]
    OperationFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
