use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;
use video_converter::Config;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();

    // Load configuration from the settings file and CLI overrides
    let config = match Config::load() {
        Ok(config) => config,
        Err(error) => {
            error!("{}", error.report());
            return ExitCode::FAILURE;
        }
    };

    match video_converter::run(config).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            error!("{}", error.report());
            ExitCode::FAILURE
        }
    }
}
