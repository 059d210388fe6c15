use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Project not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode document: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("Failed to decode document: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

pub type DocumentResult<T> = Result<T, DocumentError>;
