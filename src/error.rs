use std::path::PathBuf;
use thiserror::Error;

/// Conditions that stop the whole batch run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{} not found. Please create it.", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed configuration in {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Source directory not found at '{}'", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Failed to read source directory '{}': {source}", .path.display())]
    ReadSource {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to create output directory '{}': {source}", .path.display())]
    CreateOutput {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "'{0}' command not found. Please ensure FFmpeg is installed and in your system's PATH."
    )]
    EncoderNotFound(String),
}

impl Error {
    /// Line logged before the process exits with a failure status.
    pub fn report(&self) -> String {
        format!("FATAL ERROR: {self}")
    }
}

pub type Result<T> = std::result::Result<T, Error>;
