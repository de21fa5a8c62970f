use std::collections::BTreeMap;
use std::sync::Arc;

use pictor_core::event::{LifecycleCommand, LifecycleEvent, LifecycleOutcome};
use tokio::sync::RwLock;

use crate::config::LifecycleConfig;
use crate::error::LifecycleError;
use crate::host::{EndpointHost, EndpointSpec};
use crate::resolver::ArtifactResolver;

/// Generated images exceed the serving container's default response cap, so
/// the limit is raised explicitly on every deploy.
const MAX_RESPONSE_SIZE_ENV: (&str, &str) = ("MMS_MAX_RESPONSE_SIZE", "20000000");

/// Entry-point script inside the script bundle.
const ENTRY_POINT: &str = "inference.py";

/// Where the endpoint stands from this manager's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    Absent,
    Provisioning,
    Active,
    Deleting,
    Failed,
}

impl std::fmt::Display for EndpointState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointState::Absent => write!(f, "absent"),
            EndpointState::Provisioning => write!(f, "provisioning"),
            EndpointState::Active => write!(f, "active"),
            EndpointState::Deleting => write!(f, "deleting"),
            EndpointState::Failed => write!(f, "failed"),
        }
    }
}

/// Drives endpoint creation and teardown on behalf of the provisioning
/// system.
///
/// One manager serves one lifecycle invocation; the provisioning system
/// serializes concurrent commands against the same physical identifier, so
/// no cross-invocation coordination happens here.
pub struct LifecycleManager {
    config: LifecycleConfig,
    resolver: Arc<dyn ArtifactResolver>,
    host: Arc<dyn EndpointHost>,
    state: RwLock<EndpointState>,
}

impl LifecycleManager {
    pub fn new(
        config: LifecycleConfig,
        resolver: Arc<dyn ArtifactResolver>,
        host: Arc<dyn EndpointHost>,
    ) -> Self {
        Self {
            config,
            resolver,
            host,
            state: RwLock::new(EndpointState::Absent),
        }
    }

    pub async fn state(&self) -> EndpointState {
        *self.state.read().await
    }

    async fn transition(&self, next: EndpointState) {
        let mut state = self.state.write().await;
        tracing::debug!(from = %*state, to = %next, "State transition");
        *state = next;
    }

    /// Route an event to its handler. This is the single entry point the
    /// provisioning system calls.
    pub async fn dispatch(&self, event: &LifecycleEvent) -> Result<LifecycleOutcome, LifecycleError> {
        tracing::info!(command = %event.command, physical_id = ?event.physical_id, "Got lifecycle event");
        match event.command {
            LifecycleCommand::Create => self.create().await,
            LifecycleCommand::Update => self.update(event).await,
            LifecycleCommand::Delete => self.delete(self.required_physical_id(event)?).await,
        }
    }

    /// Resolve artifacts and stand up the endpoint.
    ///
    /// The endpoint name is fixed by configuration and returned as the
    /// physical identifier; it stays stable across updates.
    pub async fn create(&self) -> Result<LifecycleOutcome, LifecycleError> {
        let cfg = &self.config;
        self.transition(EndpointState::Provisioning).await;

        tracing::info!(
            model_id = %cfg.model_id,
            model_version = %cfg.model_version,
            instance_type = %cfg.instance_type,
            "Resolving deploy artifacts"
        );

        let artifacts = match self
            .resolver
            .resolve(&cfg.model_id, &cfg.model_version, &cfg.instance_type)
            .await
        {
            Ok(a) => a,
            Err(e) => {
                self.transition(EndpointState::Failed).await;
                return Err(e);
            }
        };

        let mut environment = BTreeMap::new();
        environment.insert(
            MAX_RESPONSE_SIZE_ENV.0.to_string(),
            MAX_RESPONSE_SIZE_ENV.1.to_string(),
        );
        environment.insert(
            "SAGEMAKER_SUBMIT_DIRECTORY".to_string(),
            artifacts.script_uri.clone(),
        );
        environment.insert("SAGEMAKER_PROGRAM".to_string(), ENTRY_POINT.to_string());

        let spec = EndpointSpec {
            endpoint_name: cfg.endpoint_name.clone(),
            role_arn: cfg.role_arn.clone(),
            instance_type: cfg.instance_type.clone(),
            image_uri: artifacts.image_uri,
            model_data_uri: artifacts.model_data_uri,
            script_uri: artifacts.script_uri,
            environment,
        };

        tracing::info!(endpoint_name = %spec.endpoint_name, "Model deploy start");
        let endpoint_name = match self.host.deploy(&spec).await {
            Ok(name) => name,
            Err(e) => {
                self.transition(EndpointState::Failed).await;
                return Err(e);
            }
        };
        tracing::info!(endpoint_name = %endpoint_name, "Model deploy end");

        self.transition(EndpointState::Active).await;
        Ok(LifecycleOutcome {
            physical_id: endpoint_name.clone(),
            data: serde_json::json!({ "endpoint_name": endpoint_name }),
        })
    }

    /// Tear the endpoint down. Already-absent resources are treated as
    /// success, so a repeated Delete with the same physical id is a no-op.
    pub async fn delete(&self, physical_id: &str) -> Result<LifecycleOutcome, LifecycleError> {
        self.transition(EndpointState::Deleting).await;

        if let Err(e) = self.host.teardown(physical_id).await {
            self.transition(EndpointState::Failed).await;
            return Err(e);
        }

        self.transition(EndpointState::Absent).await;
        Ok(LifecycleOutcome {
            physical_id: physical_id.to_string(),
            data: serde_json::Value::Null,
        })
    }

    /// Update is delete-then-create with the new configuration. There is no
    /// in-place mutation path, and the endpoint is unavailable in between.
    pub async fn update(&self, event: &LifecycleEvent) -> Result<LifecycleOutcome, LifecycleError> {
        let physical_id = self.required_physical_id(event)?.to_string();
        self.delete(&physical_id).await?;
        self.create().await
    }

    fn required_physical_id<'a>(
        &self,
        event: &'a LifecycleEvent,
    ) -> Result<&'a str, LifecycleError> {
        event
            .physical_id
            .as_deref()
            .ok_or_else(|| LifecycleError::MissingPhysicalId {
                command: event.command.to_string(),
            })
    }
}

/// The manager wrapped with its initialization outcome.
///
/// Configuration failures at cold start must fail every command without
/// touching the hosting platform; the runtime holds either a ready manager
/// or the stored init error.
pub enum LifecycleRuntime {
    Ready(LifecycleManager),
    InitFailed(String),
}

impl LifecycleRuntime {
    pub fn ready(manager: LifecycleManager) -> Self {
        LifecycleRuntime::Ready(manager)
    }

    pub fn init_failed(error: LifecycleError) -> Self {
        LifecycleRuntime::InitFailed(error.to_string())
    }

    pub async fn dispatch(
        &self,
        event: &LifecycleEvent,
    ) -> Result<LifecycleOutcome, LifecycleError> {
        match self {
            LifecycleRuntime::Ready(manager) => manager.dispatch(event).await,
            LifecycleRuntime::InitFailed(message) => {
                tracing::error!(command = %event.command, error = %message, "Rejecting command after init failure");
                Err(LifecycleError::Init(message.clone()))
            }
        }
    }
}
