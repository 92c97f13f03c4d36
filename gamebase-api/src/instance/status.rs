use k8s_openapi::api::apps::v1::DeploymentCondition;
use serde::Serialize;
use std::fmt;

use crate::resources::DeploymentResource;

/// Lifecycle status of an instance, derived from its deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    Stopped,
    Running,
    Restarting,
    Error,
    Unknown,
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            InstanceStatus::Stopped => "STOPPED",
            InstanceStatus::Running => "RUNNING",
            InstanceStatus::Restarting => "RESTARTING",
            InstanceStatus::Error => "ERROR",
            InstanceStatus::Unknown => "UNKNOWN",
        };
        f.write_str(status)
    }
}

/// Derives the status of a deployment.
///
/// The latest condition is inspected first, a declared replica count of zero then
/// overrides whatever it implies, so a stopped deployment with stale conditions is
/// always reported as [`InstanceStatus::Stopped`].
pub fn derive_status(deployment: &DeploymentResource) -> InstanceStatus {
    let from_conditions = latest_condition(deployment.conditions())
        .map(status_from_condition)
        .unwrap_or(InstanceStatus::Unknown);

    if deployment.replicas() == 0 {
        return InstanceStatus::Stopped;
    }

    from_conditions
}

/// The most recently updated condition, later entries win ties.
fn latest_condition(conditions: &[DeploymentCondition]) -> Option<&DeploymentCondition> {
    conditions
        .iter()
        .max_by_key(|condition| condition.last_update_time.as_ref().map(|time| &time.0))
}

fn status_from_condition(condition: &DeploymentCondition) -> InstanceStatus {
    match (condition.type_.as_str(), condition.status.as_str()) {
        (_, "False") => InstanceStatus::Error,
        ("ReplicaFailure", "True") => InstanceStatus::Error,
        ("Available", "True") => InstanceStatus::Running,
        ("Progressing", "True") => InstanceStatus::Restarting,
        _ => InstanceStatus::Unknown,
    }
}
