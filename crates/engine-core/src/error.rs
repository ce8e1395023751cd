use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("Failed to access watermark file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode watermark: {0}")]
    Encode(#[from] serde_json::Error),
}
