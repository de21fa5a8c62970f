pub mod config;
pub mod error;
pub mod host;
pub mod manager;
pub mod resolver;

pub use config::LifecycleConfig;
pub use error::LifecycleError;
pub use host::{EndpointHost, EndpointSpec, HostCall, SageMakerHost, StubHost};
pub use manager::{EndpointState, LifecycleManager, LifecycleRuntime};
pub use resolver::{ArtifactResolver, JumpStartResolver, ResolvedArtifacts, StubResolver};
