use crate::config::Config;
use std::ffi::OsString;
use std::path::Path;
use std::process::{Output, Stdio};
use tokio::process::Command as TokioCommand;
use tracing::debug;

const VIDEO_CODEC: &str = "libx264";
const PRESET: &str = "slow";
const CRF: &str = "20";
const AUDIO_CODEC: &str = "aac";
const AUDIO_BITRATE: &str = "192k";

/// External transcoder invocation: H.264/AAC in MP4, scaled to a fixed height.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Encoder {
    program: String,
    resolution: u32,
}

impl Encoder {
    pub fn new(program: impl Into<String>, resolution: u32) -> Self {
        Self {
            program: program.into(),
            resolution,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.encoder.program.clone(), config.video.resolution)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Width `-1` keeps the source aspect ratio.
    pub fn scale_filter(&self) -> String {
        format!("scale=-1:{}", self.resolution)
    }

    /// Argument list handed to the program, one token per argument.
    pub fn args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::with_capacity(16);
        args.push("-y".into());
        args.push("-i".into());
        args.push(input.as_os_str().to_owned());
        args.extend(
            [
                "-c:v",
                VIDEO_CODEC,
                "-preset",
                PRESET,
                "-crf",
                CRF,
                "-vf",
            ]
            .map(OsString::from),
        );
        args.push(self.scale_filter().into());
        args.extend(["-c:a", AUDIO_CODEC, "-b:a", AUDIO_BITRATE].map(OsString::from));
        args.push(output.as_os_str().to_owned());
        args
    }

    pub fn command(&self, input: &Path, output: &Path) -> TokioCommand {
        let mut command = TokioCommand::new(&self.program);
        command
            .args(self.args(input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        command
    }

    /// Runs the transcoder to completion. An `Err` means the process could
    /// not be started; a failed conversion is reported through the exit
    /// status of the returned output.
    pub async fn run(&self, input: &Path, output: &Path) -> std::io::Result<Output> {
        debug!(
            program = %self.program,
            input = %input.display(),
            output = %output.display(),
            "spawning encoder"
        );
        self.command(input, output).output().await
    }
}
