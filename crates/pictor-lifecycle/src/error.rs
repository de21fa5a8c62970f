use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("initialization failed: {0}")]
    Init(String),

    #[error("artifact resolution failed: {0}")]
    Resolve(String),

    #[error("endpoint deploy failed: {0}")]
    Deploy(String),

    #[error("endpoint teardown failed: {0}")]
    Teardown(String),

    #[error("{command} event carries no physical id")]
    MissingPhysicalId { command: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
