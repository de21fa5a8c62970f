use serde::{Deserialize, Serialize};

/// One of the three lifecycle commands dispatched by the provisioning system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleCommand {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for LifecycleCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleCommand::Create => write!(f, "create"),
            LifecycleCommand::Update => write!(f, "update"),
            LifecycleCommand::Delete => write!(f, "delete"),
        }
    }
}

/// A lifecycle event as delivered by the provisioning system.
///
/// `physical_id` is present on Update and Delete and names the resource a
/// prior Create returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    #[serde(rename = "RequestType")]
    pub command: LifecycleCommand,
    #[serde(
        rename = "PhysicalResourceId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub physical_id: Option<String>,
}

impl LifecycleEvent {
    pub fn new(command: LifecycleCommand) -> Self {
        Self {
            command,
            physical_id: None,
        }
    }

    pub fn with_physical_id(command: LifecycleCommand, physical_id: impl Into<String>) -> Self {
        Self {
            command,
            physical_id: Some(physical_id.into()),
        }
    }
}

/// What a successful lifecycle command reports back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleOutcome {
    pub physical_id: String,
    /// Extra attributes surfaced to the provisioning system (e.g. the
    /// endpoint name for later reference by the gateway's configuration).
    #[serde(default)]
    pub data: serde_json::Value,
}
