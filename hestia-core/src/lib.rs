pub mod booking;
pub mod payment;

/// Errors surfaced by the booking backend, shared by every client seam.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Backend unreachable: {0}")]
    Transport(String),
    #[error("Backend rejected request: {0}")]
    Rejected(String),
    #[error("Unexpected response from backend: {0}")]
    Decode(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

pub type BackendResult<T> = Result<T, BackendError>;
