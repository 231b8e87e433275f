use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExtractorError>;

#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Empty source file: {0}")]
    EmptyFile(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
