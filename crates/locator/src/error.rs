use thiserror::Error;

pub type Result<T> = std::result::Result<T, LocatorError>;

#[derive(Error, Debug)]
pub enum LocatorError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Runtime cache build failed: {0}")]
    CacheBuild(String),

    #[error("Decompiler timed out after {0}s")]
    DecompilerTimeout(u64),

    #[error("{0}")]
    Other(String),
}
