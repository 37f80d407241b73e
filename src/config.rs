use crate::error::{Error, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind as StdIoErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

/// Settings file looked up in the working directory when `--config` is absent.
pub const SETTINGS_FILE: &str = "settings.toml";

const DEFAULT_ENCODER: &str = "ffmpeg";

/// Command line arguments. Every override is optional; the settings file is
/// always read and these values replace the file's ones when given.
#[derive(Debug, Clone, Default, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Settings file path
    #[arg(short, long, default_value = SETTINGS_FILE)]
    pub config: PathBuf,

    /// Directory holding the videos to convert
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Directory receiving the converted videos
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Target vertical resolution in pixels
    #[arg(short, long)]
    pub resolution: Option<u32>,

    /// Delete each input once it has been converted
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub remove_on_finish: Option<bool>,

    /// Transcoding program to invoke
    #[arg(short, long)]
    pub encoder: Option<String>,
}

/// Batch configuration loaded from `settings.toml`
///
/// Example configuration file content
/// [path]
/// source = "Videos to convert"
/// output = "Converted videos"
/// remove-on-finish = false
///
/// [video]
/// resolution = 540
///
/// # Optional, defaults to "ffmpeg" looked up in PATH
/// [encoder]
/// program = "ffmpeg"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub path: PathSection,
    pub video: VideoSection,
    #[serde(default)]
    pub encoder: EncoderSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSection {
    pub source: PathBuf,
    pub output: PathBuf,
    #[serde(rename = "remove-on-finish")]
    pub remove_on_finish: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSection {
    /// Target height; the width follows the source aspect ratio.
    pub resolution: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderSection {
    #[serde(default = "default_encoder")]
    pub program: String,
}

impl Default for EncoderSection {
    fn default() -> Self {
        Self {
            program: default_encoder(),
        }
    }
}

fn default_encoder() -> String {
    DEFAULT_ENCODER.to_string()
}

impl Config {
    /// Load configuration from the settings file, with CLI args taking precedence
    pub fn load() -> Result<Self> {
        Self::load_with(Args::parse())
    }

    pub fn load_with(args: Args) -> Result<Self> {
        let config = Self::from_file(&args.config)?.merge_with_args(args);
        config.validate()?;
        info!(settings = %config.to_log_string(), "Settings loaded");
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == StdIoErrorKind::NotFound {
                Error::ConfigNotFound(path.to_path_buf())
            } else {
                Error::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        toml::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn merge_with_args(mut self, args: Args) -> Self {
        if let Some(source) = args.source {
            self.path.source = source;
        }
        if let Some(output) = args.output {
            self.path.output = output;
        }
        if let Some(remove_on_finish) = args.remove_on_finish {
            self.path.remove_on_finish = remove_on_finish;
        }
        if let Some(resolution) = args.resolution {
            self.video.resolution = resolution;
        }
        if let Some(program) = args.encoder {
            self.encoder.program = program;
        }

        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.path.source.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "path.source cannot be empty".to_string(),
            ));
        }
        if self.path.output.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "path.output cannot be empty".to_string(),
            ));
        }
        if self.video.resolution == 0 {
            return Err(Error::InvalidConfig(
                "video.resolution must be greater than 0".to_string(),
            ));
        }
        if self.encoder.program.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "encoder.program cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Single-line rendering used when logging the loaded settings.
    pub fn to_log_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}
