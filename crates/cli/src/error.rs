use engine_config::error::ConfigError;
use engine_core::error::WatermarkError;
use engine_runtime::error::PipelineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Watermark error: {0}")]
    Watermark(#[from] WatermarkError),

    #[error("Failed to write the report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize the report to JSON: {0}")]
    JsonSerialize(serde_json::Error),

    #[error("Pipeline run failed: {0}")]
    RunFailed(String),
}
