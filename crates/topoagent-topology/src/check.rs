//! The check boundary: how the agent hands instance configuration to a
//! topology collector and receives a snapshot back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::model::TopologySnapshot;

/// Errors a collector run can produce.
#[derive(Error, Debug)]
pub enum CheckError {
    /// The check configuration as a whole is unusable.
    #[error("{0}")]
    Configuration(String),

    /// A mandatory per-instance field is absent.
    #[error("{check} instance is missing mandatory \"{field}\" value")]
    MissingField {
        check: &'static str,
        field: &'static str,
    },

    /// Talking to the external system failed.
    #[error("collection failed: {0}")]
    Collection(String),
}

/// One configured instance of a check, as written in its config file.
///
/// The well-known fields are typed; everything else a specific collector
/// needs lands in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InstanceConfig {
    /// The `url` field, or a `MissingField` error naming `check`.
    pub fn require_url(&self, check: &'static str) -> Result<&str, CheckError> {
        self.url
            .as_deref()
            .ok_or(CheckError::MissingField { check, field: "url" })
    }
}

/// A topology collector.
///
/// Implementations poll an external system and map what they find into
/// an instance-scoped [`TopologySnapshot`].
pub trait TopologyCheck {
    /// Instance type recorded in the snapshots this check emits.
    fn instance_type(&self) -> &str;

    /// Run one collection cycle for `instance`.
    fn check(&mut self, instance: &InstanceConfig) -> Result<TopologySnapshot, CheckError>;
}

/// Validate a check configured to run against exactly one instance.
///
/// Checks that scope their topology to a whole cluster cannot meaningfully
/// run twice in the same agent, so a second instance is a configuration
/// error rather than a silent merge.
pub fn single_instance<'a>(
    check_name: &str,
    instances: &'a [InstanceConfig],
) -> Result<&'a InstanceConfig, CheckError> {
    match instances {
        [instance] => {
            debug!(check = check_name, "running single configured instance");
            Ok(instance)
        }
        [] => Err(CheckError::Configuration(format!(
            "{check_name} requires one configured instance"
        ))),
        _ => Err(CheckError::Configuration(format!(
            "{check_name} can only run one instance per agent, found {}",
            instances.len()
        ))),
    }
}
