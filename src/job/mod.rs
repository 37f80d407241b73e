pub mod convert;
pub mod manager;

use anyhow::Context as _;
use std::ffi::{OsStr, OsString};
use std::io::ErrorKind as StdIoErrorKind;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tempfile::TempPath;
use tracing::{info, warn};

// Re-exports for convenience
pub use convert::Encoder;
pub use manager::{BatchSummary, run_batch};

/// Container extension every output file gets, whatever the input was.
pub const OUTPUT_EXTENSION: &str = "mp4";

/// `clip.final.mov -> clip.final.mp4`, `clip -> clip.mp4`, `clip. -> clip.mp4`
///
/// A trailing dot counts as an empty extension and is dropped.
pub fn output_file_name(input: &Path) -> OsString {
    let mut name = input
        .file_stem()
        .unwrap_or_else(|| input.as_os_str())
        .to_owned();
    name.push(".");
    name.push(OUTPUT_EXTENSION);
    name
}

/// Outcome of converting a single source entry.
#[derive(Debug)]
pub enum JobResult {
    Converted,
    /// The encoder program could not be found; no later file can succeed either.
    EncoderMissing,
    EncoderFailed {
        status: ExitStatus,
        stderr: String,
    },
    Unexpected(anyhow::Error),
}

/// One source entry and where its converted output goes.
#[derive(Clone, Debug)]
pub struct ConvertJob {
    name: OsString,
    input: PathBuf,
    output: PathBuf,
}

impl ConvertJob {
    pub fn new(name: &OsStr, source_dir: &Path, output_dir: &Path) -> Self {
        let input = source_dir.join(name);
        let output = output_dir.join(output_file_name(Path::new(name)));
        Self {
            name: name.to_owned(),
            input,
            output,
        }
    }

    pub fn name(&self) -> &OsStr {
        &self.name
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Convert the input and, on success, optionally remove it.
    ///
    /// The encoder writes into a staging file next to the final output, which
    /// is renamed into place only once the encoder reported success. A failed
    /// run only ever discards its own staging file. The input is only deleted
    /// after the output has been moved into place.
    pub async fn execute(&self, encoder: &Encoder, remove_on_finish: bool) -> JobResult {
        if self.input == self.output {
            return JobResult::Unexpected(anyhow::anyhow!(
                "output {} is the input itself",
                self.output.display()
            ));
        }

        let staging = match self.staging_path() {
            Ok(staging) => staging,
            Err(error) => return JobResult::Unexpected(error),
        };

        let output = match encoder.run(&self.input, &staging).await {
            Ok(output) => output,
            Err(error) if error.kind() == StdIoErrorKind::NotFound => {
                discard(staging);
                return JobResult::EncoderMissing;
            }
            Err(error) => {
                discard(staging);
                return JobResult::Unexpected(
                    anyhow::Error::new(error)
                        .context(format!("failed to run '{}'", encoder.program())),
                );
            }
        };

        if !output.status.success() {
            discard(staging);
            return JobResult::EncoderFailed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            };
        }

        if let Err(error) = staging.persist(&self.output) {
            return JobResult::Unexpected(
                anyhow::Error::new(error.error)
                    .context(format!("failed to move output to {}", self.output.display())),
            );
        }

        if remove_on_finish {
            if let Err(error) = tokio::fs::remove_file(&self.input)
                .await
                .with_context(|| format!("failed to remove input {}", self.input.display()))
            {
                return JobResult::Unexpected(error);
            }
            info!(input = %self.input.display(), "Input file removed");
        }

        JobResult::Converted
    }

    /// Hidden `.mp4` file in the output directory; the extension lets the
    /// encoder pick the container.
    fn staging_path(&self) -> anyhow::Result<TempPath> {
        let dir = self.output.parent().unwrap_or_else(|| Path::new("."));
        let staging = tempfile::Builder::new()
            .prefix(".converting-")
            .suffix(&format!(".{OUTPUT_EXTENSION}"))
            .tempfile_in(dir)
            .with_context(|| format!("failed to create staging file in {}", dir.display()))?;
        Ok(staging.into_temp_path())
    }
}

fn discard(staging: TempPath) {
    let path = staging.to_path_buf();
    if let Err(error) = staging.close() {
        warn!(?error, staging = %path.display(), "Failed to remove partial output");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_name_replaces_extension() {
        assert_eq!(output_file_name(Path::new("a.mov")), "a.mp4");
        assert_eq!(output_file_name(Path::new("b.mkv")), "b.mp4");
        assert_eq!(output_file_name(Path::new("c.mp4")), "c.mp4");
    }

    #[test]
    fn test_output_name_keeps_inner_dots() {
        assert_eq!(output_file_name(Path::new("clip.final.mov")), "clip.final.mp4");
    }

    #[test]
    fn test_output_name_without_extension() {
        assert_eq!(output_file_name(Path::new("clip")), "clip.mp4");
    }

    #[test]
    fn test_output_name_trailing_dot() {
        assert_eq!(output_file_name(Path::new("clip.")), "clip.mp4");
    }

    #[test]
    fn test_convert_job_paths() {
        let job = ConvertJob::new(
            OsStr::new("holiday 2024.avi"),
            Path::new("/videos/in"),
            Path::new("/videos/out"),
        );
        assert_eq!(job.input(), Path::new("/videos/in/holiday 2024.avi"));
        assert_eq!(job.output(), Path::new("/videos/out/holiday 2024.mp4"));
        assert_eq!(job.name(), "holiday 2024.avi");
    }

    #[tokio::test]
    async fn missing_encoder_keeps_input() {
        let workspace = tempfile::tempdir().expect("create tempdir");
        let input = workspace.path().join("a.mov");
        tokio::fs::write(&input, b"video").await.expect("write input");

        let job = ConvertJob::new(OsStr::new("a.mov"), workspace.path(), workspace.path());
        let encoder = Encoder::new(workspace.path().join("missing").to_string_lossy(), 720);

        let result = job.execute(&encoder, true).await;
        assert!(matches!(result, JobResult::EncoderMissing));
        assert!(tokio::fs::metadata(&input).await.is_ok());
    }

    #[tokio::test]
    async fn output_equal_to_input_is_refused() {
        let workspace = tempfile::tempdir().expect("create tempdir");
        let input = workspace.path().join("a.mp4");
        tokio::fs::write(&input, b"video").await.expect("write input");

        let job = ConvertJob::new(OsStr::new("a.mp4"), workspace.path(), workspace.path());
        let encoder = Encoder::new("ffmpeg", 720);

        let result = job.execute(&encoder, true).await;
        assert!(matches!(result, JobResult::Unexpected(_)));
        assert_eq!(tokio::fs::read(&input).await.expect("input kept"), b"video");
    }

    #[cfg(unix)]
    fn write_encoder(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write encoder");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("make encoder executable");
        path.display().to_string()
    }

    #[cfg(unix)]
    fn entries(dir: &Path) -> Vec<OsString> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .expect("read dir")
            .map(|entry| entry.expect("dir entry").file_name())
            .collect();
        names.sort();
        names
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn encoder_failure_reports_stderr() {
        let workspace = tempfile::tempdir().expect("create tempdir");
        let source = workspace.path().join("in");
        let output = workspace.path().join("out");
        std::fs::create_dir_all(&source).expect("create source");
        std::fs::create_dir_all(&output).expect("create output");
        let input = source.join("b.mkv");
        tokio::fs::write(&input, b"video").await.expect("write input");

        // Writes a partial file to the last argument, then fails
        let program = write_encoder(
            workspace.path(),
            r#"for arg in "$@"; do out="$arg"; done
printf partial > "$out"
echo "invalid data" >&2
exit 1"#,
        );
        let job = ConvertJob::new(OsStr::new("b.mkv"), &source, &output);

        let result = job.execute(&Encoder::new(program, 720), true).await;
        let JobResult::EncoderFailed { status, stderr } = result else {
            panic!("expected encoder failure");
        };
        assert!(!status.success());
        assert!(stderr.contains("invalid data"));
        assert!(tokio::fs::metadata(&input).await.is_ok());
        assert!(entries(&output).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failure_keeps_existing_output() {
        let workspace = tempfile::tempdir().expect("create tempdir");
        let input = workspace.path().join("clip.mov");
        let output_dir = workspace.path().join("out");
        std::fs::create_dir_all(&output_dir).expect("create output");
        tokio::fs::write(&input, b"video").await.expect("write input");
        tokio::fs::write(output_dir.join("clip.mp4"), b"earlier")
            .await
            .expect("write earlier output");

        let program = write_encoder(workspace.path(), "exit 1");
        let job = ConvertJob::new(OsStr::new("clip.mov"), workspace.path(), &output_dir);

        let result = job.execute(&Encoder::new(program, 720), false).await;
        assert!(matches!(result, JobResult::EncoderFailed { .. }));
        assert_eq!(
            tokio::fs::read(output_dir.join("clip.mp4")).await.unwrap(),
            b"earlier"
        );
        assert_eq!(entries(&output_dir), [OsString::from("clip.mp4")]);
    }
}
