use thiserror::Error;

#[derive(Debug, Error)]
pub enum CdError {
    #[error("Invalid mm:ss:ff format: {0}")]
    InvalidFormat(String),
}

pub type CdResult<T> = Result<T, CdError>;
