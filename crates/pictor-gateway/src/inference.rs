use std::future::Future;
use std::pin::Pin;

use aws_sdk_sagemakerruntime::primitives::Blob;

use crate::error::GatewayError;

/// Content type the serving container expects for a raw prompt.
const PROMPT_CONTENT_TYPE: &str = "application/x-text";
/// Response format requested from the endpoint.
const RESPONSE_ACCEPT: &str = "application/json";

/// Facade trait for the hosted model endpoint.
///
/// Implementations forward a prompt to the real endpoint, or return canned
/// payloads for testing.
pub trait InferenceClient: Send + Sync {
    /// Send a prompt and return the raw response payload.
    fn invoke<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, GatewayError>> + Send + 'a>>;
}

/// Inference client backed by the SageMaker runtime.
pub struct SageMakerInference {
    client: aws_sdk_sagemakerruntime::Client,
    endpoint_name: String,
}

impl SageMakerInference {
    pub fn new(client: aws_sdk_sagemakerruntime::Client, endpoint_name: String) -> Self {
        Self {
            client,
            endpoint_name,
        }
    }
}

impl InferenceClient for SageMakerInference {
    fn invoke<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, GatewayError>> + Send + 'a>> {
        Box::pin(async move {
            tracing::debug!(endpoint_name = %self.endpoint_name, "Invoking endpoint");

            let resp = self
                .client
                .invoke_endpoint()
                .endpoint_name(&self.endpoint_name)
                .content_type(PROMPT_CONTENT_TYPE)
                .accept(RESPONSE_ACCEPT)
                .body(Blob::new(prompt.as_bytes().to_vec()))
                .send()
                .await
                .map_err(|e| GatewayError::Inference(e.to_string()))?;

            let bytes = resp.body.map(Blob::into_inner).unwrap_or_default();
            if bytes.is_empty() {
                return Err(GatewayError::Inference(
                    "endpoint returned an empty response body".into(),
                ));
            }
            Ok(bytes)
        })
    }
}

/// Inference client returning a fixed result, for tests.
pub struct StubInference {
    result: Result<Vec<u8>, String>,
    call_count: std::sync::atomic::AtomicUsize,
}

impl StubInference {
    /// A stub that always succeeds with the given payload.
    pub fn with_payload(payload: &[u8]) -> Self {
        Self {
            result: Ok(payload.to_vec()),
            call_count: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// A stub whose invocations always fail.
    pub fn failing(reason: &str) -> Self {
        Self {
            result: Err(reason.to_string()),
            call_count: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(std::sync::atomic::Ordering::Relaxed)
    }
}

impl InferenceClient for StubInference {
    fn invoke<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, GatewayError>> + Send + 'a>> {
        Box::pin(async move {
            self.call_count
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            match &self.result {
                Ok(payload) => Ok(payload.clone()),
                Err(reason) => Err(GatewayError::Inference(reason.clone())),
            }
        })
    }
}
