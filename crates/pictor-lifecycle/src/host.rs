use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use aws_sdk_sagemaker::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_sagemaker::types::{
    ContainerDefinition, EndpointStatus, ProductionVariant, ProductionVariantInstanceType,
};

use crate::error::LifecycleError;

/// Everything the hosting platform needs to stand up one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSpec {
    /// Endpoint name; also used for the model and endpoint config, and
    /// returned as the physical identifier.
    pub endpoint_name: String,
    pub role_arn: String,
    pub instance_type: String,
    pub image_uri: String,
    pub model_data_uri: String,
    pub script_uri: String,
    /// Container environment overrides.
    pub environment: BTreeMap<String, String>,
}

/// Facade trait for the hosting platform.
///
/// `deploy` creates the full model/config/endpoint chain and resolves once
/// the endpoint is serving. `teardown` removes the chain and treats an
/// already-absent resource as success, so Delete is idempotent.
pub trait EndpointHost: Send + Sync {
    fn deploy<'a>(
        &'a self,
        spec: &'a EndpointSpec,
    ) -> Pin<Box<dyn Future<Output = Result<String, LifecycleError>> + Send + 'a>>;

    fn teardown<'a>(
        &'a self,
        endpoint_name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), LifecycleError>> + Send + 'a>>;
}

/// Hosting platform implementation backed by SageMaker.
pub struct SageMakerHost {
    client: aws_sdk_sagemaker::Client,
    poll_interval: Duration,
    deploy_deadline: Duration,
}

impl SageMakerHost {
    pub fn new(client: aws_sdk_sagemaker::Client) -> Self {
        Self {
            client,
            poll_interval: Duration::from_secs(15),
            // GPU endpoints routinely take 10+ minutes to come up.
            deploy_deadline: Duration::from_secs(25 * 60),
        }
    }

    /// Override the InService polling cadence and deadline.
    pub fn with_wait(mut self, poll_interval: Duration, deploy_deadline: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.deploy_deadline = deploy_deadline;
        self
    }

    async fn wait_in_service(&self, endpoint_name: &str) -> Result<(), LifecycleError> {
        let deadline = Instant::now() + self.deploy_deadline;

        loop {
            let described = self
                .client
                .describe_endpoint()
                .endpoint_name(endpoint_name)
                .send()
                .await
                .map_err(|e| LifecycleError::Deploy(describe(&e)))?;

            match described.endpoint_status() {
                Some(EndpointStatus::InService) => return Ok(()),
                Some(EndpointStatus::Failed) => {
                    let reason = described
                        .failure_reason()
                        .unwrap_or("no failure reason reported");
                    return Err(LifecycleError::Deploy(format!(
                        "endpoint {endpoint_name} entered Failed: {reason}"
                    )));
                }
                status => {
                    tracing::debug!(endpoint_name, ?status, "Waiting for endpoint");
                }
            }

            if Instant::now() >= deadline {
                return Err(LifecycleError::Deploy(format!(
                    "endpoint {endpoint_name} not InService within {:?}",
                    self.deploy_deadline
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

impl EndpointHost for SageMakerHost {
    fn deploy<'a>(
        &'a self,
        spec: &'a EndpointSpec,
    ) -> Pin<Box<dyn Future<Output = Result<String, LifecycleError>> + Send + 'a>> {
        Box::pin(async move {
            let name = &spec.endpoint_name;

            let container = ContainerDefinition::builder()
                .image(&spec.image_uri)
                .model_data_url(&spec.model_data_uri)
                .set_environment(Some(
                    spec.environment
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                ))
                .build();

            tracing::info!(endpoint_name = %name, image = %spec.image_uri, "Creating model");
            self.client
                .create_model()
                .model_name(name)
                .execution_role_arn(&spec.role_arn)
                .primary_container(container)
                .send()
                .await
                .map_err(|e| LifecycleError::Deploy(describe(&e)))?;

            let variant = ProductionVariant::builder()
                .variant_name("AllTraffic")
                .model_name(name)
                .initial_instance_count(1)
                .instance_type(ProductionVariantInstanceType::from(
                    spec.instance_type.as_str(),
                ))
                .build();

            tracing::info!(endpoint_name = %name, instance_type = %spec.instance_type, "Creating endpoint config");
            self.client
                .create_endpoint_config()
                .endpoint_config_name(name)
                .production_variants(variant)
                .send()
                .await
                .map_err(|e| LifecycleError::Deploy(describe(&e)))?;

            tracing::info!(endpoint_name = %name, "Creating endpoint");
            self.client
                .create_endpoint()
                .endpoint_name(name)
                .endpoint_config_name(name)
                .send()
                .await
                .map_err(|e| LifecycleError::Deploy(describe(&e)))?;

            self.wait_in_service(name).await?;
            tracing::info!(endpoint_name = %name, "Endpoint InService");

            Ok(name.clone())
        })
    }

    fn teardown<'a>(
        &'a self,
        endpoint_name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), LifecycleError>> + Send + 'a>> {
        Box::pin(async move {
            tracing::info!(endpoint_name, "Deleting endpoint");
            match self
                .client
                .delete_endpoint()
                .endpoint_name(endpoint_name)
                .send()
                .await
            {
                Ok(_) => {}
                Err(e) if is_not_found(&e) => {
                    tracing::info!(endpoint_name, "Endpoint already absent");
                }
                Err(e) => return Err(LifecycleError::Teardown(describe(&e))),
            }

            match self
                .client
                .delete_endpoint_config()
                .endpoint_config_name(endpoint_name)
                .send()
                .await
            {
                Ok(_) => {}
                Err(e) if is_not_found(&e) => {
                    tracing::info!(endpoint_name, "Endpoint config already absent");
                }
                Err(e) => return Err(LifecycleError::Teardown(describe(&e))),
            }

            match self
                .client
                .delete_model()
                .model_name(endpoint_name)
                .send()
                .await
            {
                Ok(_) => {}
                Err(e) if is_not_found(&e) => {
                    tracing::info!(endpoint_name, "Model already absent");
                }
                Err(e) => return Err(LifecycleError::Teardown(describe(&e))),
            }

            Ok(())
        })
    }
}

/// SageMaker reports deletes of missing resources as a ValidationException
/// with a "Could not find ..." message rather than a dedicated error type.
fn is_not_found<E, R>(err: &SdkError<E, R>) -> bool
where
    E: ProvideErrorMetadata,
{
    err.as_service_error()
        .and_then(ProvideErrorMetadata::message)
        .is_some_and(|m| m.contains("Could not find"))
}

fn describe<E, R>(err: &SdkError<E, R>) -> String
where
    E: ProvideErrorMetadata + std::error::Error,
{
    match err.as_service_error().and_then(ProvideErrorMetadata::message) {
        Some(message) => message.to_string(),
        None => err.to_string(),
    }
}

/// Calls recorded by [`StubHost`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Deploy(String),
    Teardown(String),
}

/// In-memory hosting platform for tests.
///
/// Tracks which endpoints exist and records every call for ordering
/// assertions. Teardown of an absent endpoint succeeds, matching the real
/// host's idempotency contract.
#[derive(Default)]
pub struct StubHost {
    endpoints: Mutex<HashSet<String>>,
    calls: Mutex<Vec<HostCall>>,
    specs: Mutex<Vec<EndpointSpec>>,
    fail_deploy: Option<String>,
}

impl StubHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host whose deploys always fail with the given reason.
    pub fn failing_deploy(reason: &str) -> Self {
        Self {
            fail_deploy: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn live_endpoints(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .endpoints
            .lock()
            .expect("endpoints lock")
            .iter()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn deployed_specs(&self) -> Vec<EndpointSpec> {
        self.specs.lock().expect("specs lock").clone()
    }
}

impl EndpointHost for StubHost {
    fn deploy<'a>(
        &'a self,
        spec: &'a EndpointSpec,
    ) -> Pin<Box<dyn Future<Output = Result<String, LifecycleError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls
                .lock()
                .expect("calls lock")
                .push(HostCall::Deploy(spec.endpoint_name.clone()));

            if let Some(reason) = &self.fail_deploy {
                return Err(LifecycleError::Deploy(reason.clone()));
            }

            self.specs.lock().expect("specs lock").push(spec.clone());
            self.endpoints
                .lock()
                .expect("endpoints lock")
                .insert(spec.endpoint_name.clone());
            Ok(spec.endpoint_name.clone())
        })
    }

    fn teardown<'a>(
        &'a self,
        endpoint_name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), LifecycleError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls
                .lock()
                .expect("calls lock")
                .push(HostCall::Teardown(endpoint_name.to_string()));

            // Absent endpoints are fine: teardown is idempotent.
            self.endpoints
                .lock()
                .expect("endpoints lock")
                .remove(endpoint_name);
            Ok(())
        })
    }
}
