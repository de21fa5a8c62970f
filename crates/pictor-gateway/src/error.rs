use pictor_core::error::DecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("inference call failed: {0}")]
    Inference(String),

    #[error("inference payload decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("artifact persistence failed: {0}")]
    Storage(String),
}

impl GatewayError {
    /// HTTP status the error envelope carries. Remote inference failures are
    /// an upstream problem (502); decode and persistence failures are ours
    /// (500).
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Inference(_) => 502,
            GatewayError::Config(_) | GatewayError::Decode(_) | GatewayError::Storage(_) => 500,
        }
    }
}
