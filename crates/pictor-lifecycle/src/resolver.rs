use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Deserialize;

use crate::error::LifecycleError;

/// The three platform artifact locators a deploy needs: the inference
/// container image, the entry-script bundle, and the model weights bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifacts {
    pub image_uri: String,
    pub script_uri: String,
    pub model_data_uri: String,
}

/// Facade trait for artifact resolution.
///
/// Implementations consult the model catalog for a (model id, version,
/// instance type) tuple, or return fixed locators for testing.
pub trait ArtifactResolver: Send + Sync {
    fn resolve<'a>(
        &'a self,
        model_id: &'a str,
        model_version: &'a str,
        instance_type: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ResolvedArtifacts, LifecycleError>> + Send + 'a>>;
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    model_id: String,
    version: String,
    spec_key: String,
}

#[derive(Debug, Deserialize)]
struct ModelSpec {
    hosting_artifact_key: String,
    hosting_script_key: String,
    #[serde(default)]
    hosting_ecr_uri: Option<String>,
    #[serde(default)]
    hosting_ecr_specs: Option<EcrSpecs>,
}

#[derive(Debug, Deserialize)]
struct EcrSpecs {
    framework: String,
    framework_version: String,
    py_version: String,
}

/// Resolves model artifacts from the public JumpStart catalog.
///
/// The catalog lives in a regional public bucket: a `models_manifest.json`
/// index mapping (model id, version) to a per-model spec file, which in turn
/// names the hosting container and the S3 keys for the script and weights
/// bundles.
pub struct JumpStartResolver {
    http: reqwest::Client,
    region: String,
    base_url: String,
    bucket: String,
}

impl JumpStartResolver {
    /// Request timeout for catalog fetches. The manifest is a few MB; the
    /// spec files are small.
    const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(region: impl Into<String>) -> Result<Self, LifecycleError> {
        let region = region.into();
        let http = reqwest::Client::builder()
            .timeout(Self::FETCH_TIMEOUT)
            .build()
            .map_err(|e| LifecycleError::Init(format!("HTTP client construction failed: {e}")))?;
        let bucket = format!("jumpstart-cache-prod-{region}");
        let base_url = format!("https://{bucket}.s3.{region}.amazonaws.com");
        Ok(Self {
            http,
            region,
            base_url,
            bucket,
        })
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<T, LifecycleError> {
        let url = format!("{}/{key}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| LifecycleError::Resolve(format!("fetching {key}: {e}")))?;

        if !resp.status().is_success() {
            return Err(LifecycleError::Resolve(format!(
                "fetching {key}: catalog returned {}",
                resp.status()
            )));
        }

        resp.json::<T>()
            .await
            .map_err(|e| LifecycleError::Resolve(format!("parsing {key}: {e}")))
    }

    fn image_uri(&self, spec: &ModelSpec, instance_type: &str) -> Result<String, LifecycleError> {
        if let Some(uri) = &spec.hosting_ecr_uri {
            return Ok(uri.clone());
        }

        let ecr = spec.hosting_ecr_specs.as_ref().ok_or_else(|| {
            LifecycleError::Resolve("model spec names no hosting container".into())
        })?;
        let registry = dlc_registry(&self.region).ok_or_else(|| {
            LifecycleError::Resolve(format!(
                "no deep-learning container registry known for region {}",
                self.region
            ))
        })?;

        let repository = match ecr.framework.as_str() {
            "huggingface" => "huggingface-pytorch-inference".to_string(),
            other => format!("{other}-inference"),
        };
        let processor = if is_gpu_instance(instance_type) { "gpu" } else { "cpu" };

        Ok(format!(
            "{registry}.dkr.ecr.{region}.amazonaws.com/{repository}:{version}-{processor}-{py}",
            region = self.region,
            version = ecr.framework_version,
            py = ecr.py_version,
        ))
    }
}

impl ArtifactResolver for JumpStartResolver {
    fn resolve<'a>(
        &'a self,
        model_id: &'a str,
        model_version: &'a str,
        instance_type: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ResolvedArtifacts, LifecycleError>> + Send + 'a>> {
        Box::pin(async move {
            let manifest: Vec<ManifestEntry> = self.fetch_json("models_manifest.json").await?;

            let entry = select_entry(&manifest, model_id, model_version).ok_or_else(|| {
                LifecycleError::Resolve(format!(
                    "model {model_id} version {model_version} not present in catalog"
                ))
            })?;

            tracing::info!(
                model_id,
                version = entry.version,
                spec_key = entry.spec_key,
                "Resolved catalog entry"
            );

            let spec: ModelSpec = self.fetch_json(&entry.spec_key).await?;
            let image_uri = self.image_uri(&spec, instance_type)?;

            Ok(ResolvedArtifacts {
                image_uri,
                script_uri: format!("s3://{}/{}", self.bucket, spec.hosting_script_key),
                model_data_uri: format!("s3://{}/{}", self.bucket, spec.hosting_artifact_key),
            })
        })
    }
}

/// Pick the manifest entry matching `model_id` at `version`, where `"*"`
/// selects the highest published version.
fn select_entry<'a>(
    manifest: &'a [ManifestEntry],
    model_id: &str,
    version: &str,
) -> Option<&'a ManifestEntry> {
    let candidates = manifest.iter().filter(|e| e.model_id == model_id);
    if version == "*" {
        candidates.max_by(|a, b| compare_versions(&a.version, &b.version))
    } else {
        candidates.into_iter().find(|e| e.version == version)
    }
}

/// Numeric dotted-version comparison ("2.10.0" > "2.9.1").
fn compare_versions(a: &str, b: &str) -> std::cmp::Ordering {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|part| part.parse::<u64>().unwrap_or(0))
            .collect()
    };
    parse(a).cmp(&parse(b))
}

/// The shared AWS account hosting deep-learning container images in the
/// commercial regions PICTOR supports.
fn dlc_registry(region: &str) -> Option<&'static str> {
    match region {
        "us-east-1" | "us-east-2" | "us-west-1" | "us-west-2" | "ca-central-1" | "eu-west-1"
        | "eu-west-2" | "eu-west-3" | "eu-central-1" | "eu-north-1" | "ap-southeast-1"
        | "ap-southeast-2" | "ap-northeast-1" | "ap-northeast-2" | "ap-south-1" | "sa-east-1" => {
            Some("763104351884")
        }
        _ => None,
    }
}

fn is_gpu_instance(instance_type: &str) -> bool {
    ["ml.p", "ml.g"]
        .iter()
        .any(|family| instance_type.starts_with(family))
}

/// Resolver returning fixed artifacts, for tests.
pub struct StubResolver {
    artifacts: ResolvedArtifacts,
}

impl StubResolver {
    pub fn new(artifacts: ResolvedArtifacts) -> Self {
        Self { artifacts }
    }

    pub fn with_defaults() -> Self {
        Self::new(ResolvedArtifacts {
            image_uri: "123456789012.dkr.ecr.us-east-1.amazonaws.com/stub-inference:latest".into(),
            script_uri: "s3://stub-bucket/scripts/inference.tar.gz".into(),
            model_data_uri: "s3://stub-bucket/models/model.tar.gz".into(),
        })
    }
}

impl ArtifactResolver for StubResolver {
    fn resolve<'a>(
        &'a self,
        _model_id: &'a str,
        _model_version: &'a str,
        _instance_type: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ResolvedArtifacts, LifecycleError>> + Send + 'a>> {
        Box::pin(async move { Ok(self.artifacts.clone()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> Vec<ManifestEntry> {
        serde_json::from_str(
            r#"[
                {"model_id": "model-txt2img-sd", "version": "1.0.0", "spec_key": "specs/sd-1.0.0.json"},
                {"model_id": "model-txt2img-sd", "version": "2.10.0", "spec_key": "specs/sd-2.10.0.json"},
                {"model_id": "model-txt2img-sd", "version": "2.9.1", "spec_key": "specs/sd-2.9.1.json"},
                {"model_id": "other-model", "version": "9.0.0", "spec_key": "specs/other.json"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn wildcard_selects_highest_version() {
        let manifest = manifest();
        let entry = select_entry(&manifest, "model-txt2img-sd", "*").unwrap();
        assert_eq!(entry.version, "2.10.0");
    }

    #[test]
    fn exact_version_is_honored() {
        let manifest = manifest();
        let entry = select_entry(&manifest, "model-txt2img-sd", "1.0.0").unwrap();
        assert_eq!(entry.spec_key, "specs/sd-1.0.0.json");
    }

    #[test]
    fn unknown_model_is_none() {
        assert!(select_entry(&manifest(), "missing-model", "*").is_none());
    }

    #[test]
    fn version_comparison_is_numeric() {
        assert_eq!(
            compare_versions("2.10.0", "2.9.1"),
            std::cmp::Ordering::Greater
        );
    }

    #[test]
    fn spec_image_uri_prefers_explicit_uri() {
        let resolver = JumpStartResolver::new("us-east-1").unwrap();
        let spec: ModelSpec = serde_json::from_str(
            r#"{
                "hosting_artifact_key": "models/m.tar.gz",
                "hosting_script_key": "scripts/s.tar.gz",
                "hosting_ecr_uri": "111122223333.dkr.ecr.us-east-1.amazonaws.com/custom:1"
            }"#,
        )
        .unwrap();

        let uri = resolver.image_uri(&spec, "ml.g5.24xlarge").unwrap();
        assert_eq!(uri, "111122223333.dkr.ecr.us-east-1.amazonaws.com/custom:1");
    }

    #[test]
    fn spec_image_uri_built_from_ecr_specs() {
        let resolver = JumpStartResolver::new("us-east-1").unwrap();
        let spec: ModelSpec = serde_json::from_str(
            r#"{
                "hosting_artifact_key": "models/m.tar.gz",
                "hosting_script_key": "scripts/s.tar.gz",
                "hosting_ecr_specs": {
                    "framework": "huggingface",
                    "framework_version": "1.10.2",
                    "py_version": "py38"
                }
            }"#,
        )
        .unwrap();

        let uri = resolver.image_uri(&spec, "ml.g5.24xlarge").unwrap();
        assert_eq!(
            uri,
            "763104351884.dkr.ecr.us-east-1.amazonaws.com/huggingface-pytorch-inference:1.10.2-gpu-py38"
        );
    }

    #[test]
    fn unknown_region_has_no_registry() {
        let resolver = JumpStartResolver::new("mars-north-1").unwrap();
        let spec: ModelSpec = serde_json::from_str(
            r#"{
                "hosting_artifact_key": "models/m.tar.gz",
                "hosting_script_key": "scripts/s.tar.gz",
                "hosting_ecr_specs": {
                    "framework": "pytorch",
                    "framework_version": "1.12",
                    "py_version": "py38"
                }
            }"#,
        )
        .unwrap();

        assert!(matches!(
            resolver.image_uri(&spec, "ml.p3.2xlarge").unwrap_err(),
            LifecycleError::Resolve(_)
        ));
    }

    #[test]
    fn gpu_detection_by_instance_family() {
        assert!(is_gpu_instance("ml.g5.24xlarge"));
        assert!(is_gpu_instance("ml.p3.2xlarge"));
        assert!(!is_gpu_instance("ml.m5.xlarge"));
    }
}
