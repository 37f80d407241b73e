pub mod config;
pub mod error;
pub mod job;

//
// Re-export
//
pub use config::{Args, Config, SETTINGS_FILE};
pub use error::{Error, Result};
pub use job::{BatchSummary, ConvertJob, Encoder, JobResult, output_file_name};

/// Convert every video of the configured source directory.
pub async fn run(config: Config) -> Result<BatchSummary> {
    job::run_batch(&config).await
}
