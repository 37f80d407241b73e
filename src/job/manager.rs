use crate::config::Config;
use crate::error::{Error, Result};
use crate::job::{ConvertJob, Encoder, JobResult};
use std::collections::HashSet;
use std::ffi::OsString;
use std::io::ErrorKind as StdIoErrorKind;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Tally of a finished batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub found: usize,
    pub converted: usize,
    pub failed: usize,
}

/// Converts every entry of the source directory, one at a time.
///
/// Returns `Err` only for conditions that stop the whole batch: the source
/// directory is missing or unreadable, the output directory cannot be
/// created, or the encoder program does not exist. Per-file failures are
/// logged and counted in the summary.
pub async fn run_batch(config: &Config) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();
    let source_dir = config.path.source.as_path();
    let output_dir = config.path.output.as_path();

    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|source| Error::CreateOutput {
            path: output_dir.to_path_buf(),
            source,
        })?;

    let videos = list_source(source_dir).await?;
    if videos.is_empty() {
        info!(source = %source_dir.display(), "No videos found. Nothing to do.");
        return Ok(summary);
    }

    summary.found = videos.len();
    info!(count = summary.found, "Found videos to process");

    let source_dir = tokio::fs::canonicalize(source_dir)
        .await
        .map_err(|source| Error::ReadSource {
            path: source_dir.to_path_buf(),
            source,
        })?;
    let output_dir = tokio::fs::canonicalize(output_dir)
        .await
        .map_err(|source| Error::CreateOutput {
            path: output_dir.to_path_buf(),
            source,
        })?;

    let encoder = Encoder::from_config(config);
    let jobs: Vec<ConvertJob> = videos
        .iter()
        .map(|video| ConvertJob::new(video, &source_dir, &output_dir))
        .collect();
    // Outputs must never replace a source entry or an output written earlier in this run
    let inputs: HashSet<&Path> = jobs.iter().map(ConvertJob::input).collect();
    let mut produced: HashSet<PathBuf> = HashSet::new();

    for job in &jobs {
        let file = job.name().to_string_lossy();
        info!(
            %file,
            input = %job.input().display(),
            output = %job.output().display(),
            resolution = encoder.resolution(),
            "Processing"
        );

        if inputs.contains(job.output()) || produced.contains(job.output()) {
            summary.failed += 1;
            error!(
                %file,
                output = %job.output().display(),
                "Output would overwrite a source video or an earlier conversion, skipping"
            );
            continue;
        }

        match job.execute(&encoder, config.path.remove_on_finish).await {
            JobResult::Converted => {
                summary.converted += 1;
                produced.insert(job.output().to_path_buf());
                info!(%file, "Successfully converted");
            }
            JobResult::EncoderMissing => {
                return Err(Error::EncoderNotFound(encoder.program().to_string()));
            }
            JobResult::EncoderFailed { status, stderr } => {
                summary.failed += 1;
                error!(%file, %status, "Error converting");
                error!("{} stderr output:\n{}", encoder.program(), stderr.trim_end());
            }
            JobResult::Unexpected(error) => {
                summary.failed += 1;
                error!(%file, "An unexpected error occurred: {error:#}");
            }
        }
    }

    info!(
        converted = summary.converted,
        failed = summary.failed,
        "All videos processed."
    );
    Ok(summary)
}

async fn list_source(source_dir: &Path) -> Result<Vec<OsString>> {
    let read_error = |source: std::io::Error| {
        if source.kind() == StdIoErrorKind::NotFound {
            Error::SourceNotFound(source_dir.to_path_buf())
        } else {
            Error::ReadSource {
                path: source_dir.to_path_buf(),
                source,
            }
        }
    };

    let mut entries = tokio::fs::read_dir(source_dir).await.map_err(read_error)?;
    let mut videos = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
        videos.push(entry.file_name());
    }
    Ok(videos)
}
