use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Namespace used when no prefix is configured.
const DEFAULT_NAMESPACE_PREFIX: &str = "gamebaseprefix";

/// Settings describing how the orchestration cluster is addressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Prefix of every namespace managed by the service.
    ///
    /// The prefix itself names the cluster-wide namespace holding tenant secrets, tenant
    /// namespaces are named `<prefix>-user-<uuid>`.
    #[serde(default = "default_namespace_prefix")]
    pub namespace_prefix: String,
    /// Deadline applied to every single call against the cluster API.
    pub request_timeout_ms: u64,
    /// Interval between two observations while waiting for a deployment to stop.
    pub restart_poll_interval_ms: u64,
    /// Grace period assumed for deployments that do not declare one.
    pub default_termination_grace_period_secs: u64,
}

impl ClusterConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn restart_poll_interval(&self) -> Duration {
        Duration::from_millis(self.restart_poll_interval_ms)
    }

    pub fn default_termination_grace_period(&self) -> Duration {
        Duration::from_secs(self.default_termination_grace_period_secs)
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            namespace_prefix: default_namespace_prefix(),
            request_timeout_ms: 10_000,
            restart_poll_interval_ms: 1_000,
            default_termination_grace_period_secs: 30,
        }
    }
}

fn default_namespace_prefix() -> String {
    DEFAULT_NAMESPACE_PREFIX.to_string()
}
