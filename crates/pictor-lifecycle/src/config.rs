use crate::error::LifecycleError;

/// Environment variables consumed by the lifecycle manager.
pub const ENV_ROLE_ARN: &str = "PICTOR_ROLE_ARN";
pub const ENV_MODEL_ID: &str = "PICTOR_MODEL_ID";
pub const ENV_MODEL_VERSION: &str = "PICTOR_MODEL_VERSION";
pub const ENV_INSTANCE_TYPE: &str = "PICTOR_INSTANCE_TYPE";
pub const ENV_ENDPOINT_NAME: &str = "PICTOR_ENDPOINT_NAME";

fn default_endpoint_name() -> String {
    "pictor-d2".into()
}
fn default_model_version() -> String {
    "*".into()
}

/// Configuration for the lifecycle manager, sourced from the invocation
/// environment.
///
/// A missing required variable is an initialization error; the dispatcher
/// reports it for every command without touching the hosting platform.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Credential identity the hosted endpoint assumes.
    pub role_arn: String,
    pub model_id: String,
    /// Model version selector; `"*"` resolves to the latest published version.
    pub model_version: String,
    pub instance_type: String,
    /// Fixed endpoint name, doubling as the physical identifier.
    pub endpoint_name: String,
}

impl LifecycleConfig {
    pub fn from_env() -> Result<Self, LifecycleError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, LifecycleError> {
        let require = |key: &str| {
            get(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| LifecycleError::Init(format!("missing environment variable {key}")))
        };

        Ok(Self {
            role_arn: require(ENV_ROLE_ARN)?,
            model_id: require(ENV_MODEL_ID)?,
            model_version: get(ENV_MODEL_VERSION).unwrap_or_else(default_model_version),
            instance_type: require(ENV_INSTANCE_TYPE)?,
            endpoint_name: get(ENV_ENDPOINT_NAME).unwrap_or_else(default_endpoint_name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn parses_full_environment() {
        let config = LifecycleConfig::from_lookup(lookup(&[
            (ENV_ROLE_ARN, "arn:aws:iam::123456789012:role/pictor"),
            (ENV_MODEL_ID, "model-txt2img-stabilityai-stable-diffusion-v2"),
            (ENV_MODEL_VERSION, "1.0.0"),
            (ENV_INSTANCE_TYPE, "ml.g5.24xlarge"),
            (ENV_ENDPOINT_NAME, "pictor-custom"),
        ]))
        .unwrap();

        assert_eq!(config.model_version, "1.0.0");
        assert_eq!(config.endpoint_name, "pictor-custom");
    }

    #[test]
    fn defaults_endpoint_name_and_version() {
        let config = LifecycleConfig::from_lookup(lookup(&[
            (ENV_ROLE_ARN, "arn:aws:iam::123456789012:role/pictor"),
            (ENV_MODEL_ID, "model-txt2img-stabilityai-stable-diffusion-v2"),
            (ENV_INSTANCE_TYPE, "ml.p3.2xlarge"),
        ]))
        .unwrap();

        assert_eq!(config.endpoint_name, "pictor-d2");
        assert_eq!(config.model_version, "*");
    }

    #[test]
    fn missing_role_is_init_error() {
        let err = LifecycleConfig::from_lookup(lookup(&[
            (ENV_MODEL_ID, "model-txt2img-stabilityai-stable-diffusion-v2"),
            (ENV_INSTANCE_TYPE, "ml.p3.2xlarge"),
        ]))
        .unwrap_err();

        assert!(matches!(err, LifecycleError::Init(_)));
        assert!(err.to_string().contains(ENV_ROLE_ARN));
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let err = LifecycleConfig::from_lookup(lookup(&[
            (ENV_ROLE_ARN, ""),
            (ENV_MODEL_ID, "m"),
            (ENV_INSTANCE_TYPE, "ml.p3.2xlarge"),
        ]))
        .unwrap_err();

        assert!(matches!(err, LifecycleError::Init(_)));
    }
}
