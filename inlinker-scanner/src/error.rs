use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP client could not be built: {0}")]
    ClientBuild(#[from] reqwest::Error),

    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("Invalid user agent: {0}")]
    InvalidUserAgent(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
