use std::sync::Arc;
use std::time::Duration;

use pictor_core::decode::decode_image;
use pictor_core::envelope::{Response, extract_prompt};
use pictor_core::key::object_key;

use crate::error::GatewayError;
use crate::inference::InferenceClient;
use crate::store::ArtifactStore;

/// How long a retrieval link stays valid.
pub const PRESIGN_EXPIRY: Duration = Duration::from_secs(3600);

/// The stateless request handler: prompt in, presigned image link out.
///
/// Each invocation runs the pipeline once — extract, invoke, decode,
/// persist, link — and every failure mode maps to a proper response
/// envelope. Concurrent invocations are safe: each one writes its own
/// uniquely named object.
pub struct Gateway {
    inference: Arc<dyn InferenceClient>,
    store: Arc<dyn ArtifactStore>,
}

impl Gateway {
    pub fn new(inference: Arc<dyn InferenceClient>, store: Arc<dyn ArtifactStore>) -> Self {
        Self { inference, store }
    }

    /// Handle one invocation payload and produce the response envelope.
    ///
    /// Never panics: anything short of a well-formed success comes back as a
    /// 4xx/5xx envelope.
    pub async fn handle(&self, event: &serde_json::Value) -> Response {
        let prompt = match extract_prompt(event) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::info!(error = %e, "Rejecting request without prompt");
                return Response::no_prompt();
            }
        };

        tracing::info!(prompt = %prompt, "Handling inference request");
        match self.run(&prompt).await {
            Ok(url) => Response::ok(&serde_json::json!({ "url": url, "prompt": prompt })),
            Err(e) => {
                tracing::error!(error = %e, "Inference request failed");
                Response::error(e.status_code(), &e.to_string())
            }
        }
    }

    async fn run(&self, prompt: &str) -> Result<String, GatewayError> {
        let raw = self.inference.invoke(prompt).await?;

        // Decode before any persistence: a bad payload must not leave a
        // partial artifact behind.
        let img = decode_image(&raw)?;

        let key = object_key();
        let dir = tempfile::tempdir()
            .map_err(|e| GatewayError::Storage(format!("temp dir: {e}")))?;
        let path = dir.path().join(&key);
        img.save(&path)
            .map_err(|e| GatewayError::Storage(format!("writing {}: {e}", path.display())))?;

        self.store.put(&key, &path).await?;
        let url = self.store.presign(&key, PRESIGN_EXPIRY).await?;

        tracing::info!(key, "Stored generated image");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::StubInference;
    use crate::store::MemoryStore;
    use serde_json::json;

    const PAYLOAD: &[u8] = br#"{"generated_image": [[[0,0,0],[255,255,255]]]}"#;

    fn gateway(inference: StubInference, store: Arc<MemoryStore>) -> Gateway {
        Gateway::new(Arc::new(inference), store)
    }

    #[tokio::test]
    async fn success_returns_url_and_prompt() {
        let store = Arc::new(MemoryStore::new());
        let gw = gateway(StubInference::with_payload(PAYLOAD), store.clone());

        let resp = gw.handle(&json!({ "prompt": "a cat" })).await;
        assert_eq!(resp.status_code, 200);

        let body: serde_json::Value = serde_json::from_str(&resp.body).unwrap();
        assert_eq!(body["prompt"], "a cat");
        let url = body["url"].as_str().unwrap();
        assert!(url.contains(".png"));

        let objects = store.objects();
        assert_eq!(objects.len(), 1);
        assert!(objects[0].bytes > 0);
    }

    #[tokio::test]
    async fn http_post_body_is_accepted() {
        let store = Arc::new(MemoryStore::new());
        let gw = gateway(StubInference::with_payload(PAYLOAD), store);

        let event = json!({ "httpMethod": "POST", "body": r#"{"prompt": "a cat"}"# });
        let resp = gw.handle(&event).await;

        assert_eq!(resp.status_code, 200);
        let body: serde_json::Value = serde_json::from_str(&resp.body).unwrap();
        assert_eq!(body["prompt"], "a cat");
    }

    #[tokio::test]
    async fn missing_prompt_is_400_without_remote_call() {
        let store = Arc::new(MemoryStore::new());
        let inference = Arc::new(StubInference::with_payload(PAYLOAD));
        let gw = Gateway::new(inference.clone(), store.clone());

        let resp = gw.handle(&json!({ "something": "else" })).await;
        assert_eq!(resp.status_code, 400);
        assert_eq!(resp.body, r#""No prompt specified""#);
        assert_eq!(inference.calls(), 0);
        assert!(store.objects().is_empty());
    }

    #[tokio::test]
    async fn non_json_body_is_400() {
        let store = Arc::new(MemoryStore::new());
        let gw = gateway(StubInference::with_payload(PAYLOAD), store);

        let event = json!({ "httpMethod": "POST", "body": "not json" });
        let resp = gw.handle(&event).await;

        assert_eq!(resp.status_code, 400);
        assert_eq!(resp.body, r#""No prompt specified""#);
    }

    #[tokio::test]
    async fn inference_failure_is_502() {
        let store = Arc::new(MemoryStore::new());
        let gw = gateway(StubInference::failing("endpoint unreachable"), store.clone());

        let resp = gw.handle(&json!({ "prompt": "a cat" })).await;
        assert_eq!(resp.status_code, 502);

        let body: serde_json::Value = serde_json::from_str(&resp.body).unwrap();
        assert!(body["error"].as_str().unwrap().contains("endpoint unreachable"));
        assert!(store.objects().is_empty());
    }

    #[tokio::test]
    async fn decode_failure_is_500_and_nothing_is_stored() {
        let store = Arc::new(MemoryStore::new());
        let gw = gateway(StubInference::with_payload(b"not json"), store.clone());

        let resp = gw.handle(&json!({ "prompt": "a cat" })).await;
        assert_eq!(resp.status_code, 500);

        let body: serde_json::Value = serde_json::from_str(&resp.body).unwrap();
        assert!(body["error"].as_str().unwrap().contains("decode"));
        assert!(store.objects().is_empty());
        assert!(store.presigned().is_empty());
    }

    #[tokio::test]
    async fn upload_failure_is_a_proper_error_envelope() {
        let store = Arc::new(MemoryStore::failing_put());
        let gw = gateway(StubInference::with_payload(PAYLOAD), store.clone());

        let resp = gw.handle(&json!({ "prompt": "a cat" })).await;
        assert_eq!(resp.status_code, 500);

        let body: serde_json::Value = serde_json::from_str(&resp.body).unwrap();
        assert!(body["error"].is_string());
        assert!(store.presigned().is_empty());
    }

    #[tokio::test]
    async fn identical_prompts_get_distinct_keys() {
        let store = Arc::new(MemoryStore::new());
        let gw = gateway(StubInference::with_payload(PAYLOAD), store.clone());

        gw.handle(&json!({ "prompt": "a cat" })).await;
        gw.handle(&json!({ "prompt": "a cat" })).await;

        let objects = store.objects();
        assert_eq!(objects.len(), 2);
        assert_ne!(objects[0].key, objects[1].key);
    }

    #[tokio::test]
    async fn presign_expiry_is_one_hour() {
        let store = Arc::new(MemoryStore::new());
        let gw = gateway(StubInference::with_payload(PAYLOAD), store.clone());

        gw.handle(&json!({ "prompt": "a cat" })).await;

        let presigned = store.presigned();
        assert_eq!(presigned.len(), 1);
        assert_eq!(presigned[0].1, Duration::from_secs(3600));
    }
}
