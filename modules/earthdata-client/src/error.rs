use thiserror::Error;

#[derive(Error, Debug)]
pub enum EarthdataError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Earthdata API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response shape: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, EarthdataError>;
