pub mod config;
pub mod error;
pub mod gateway;
pub mod inference;
pub mod store;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use gateway::{Gateway, PRESIGN_EXPIRY};
pub use inference::{InferenceClient, SageMakerInference, StubInference};
pub use store::{ArtifactStore, MemoryStore, S3ArtifactStore, StoredObject};
