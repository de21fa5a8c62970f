use crate::error::GatewayError;

pub const ENV_ENDPOINT_NAME: &str = "PICTOR_ENDPOINT_NAME";
pub const ENV_OUTPUT_BUCKET: &str = "PICTOR_OUTPUT_BUCKET";

/// Gateway configuration, sourced from the invocation environment.
///
/// `endpoint_name` must match what the lifecycle manager provisioned; that
/// name is the only coupling between the two components.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub endpoint_name: String,
    pub output_bucket: String,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, GatewayError> {
        let require = |key: &str| {
            get(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| GatewayError::Config(format!("missing environment variable {key}")))
        };

        Ok(Self {
            endpoint_name: require(ENV_ENDPOINT_NAME)?,
            output_bucket: require(ENV_OUTPUT_BUCKET)?,
        })
    }
}
