use k8s_openapi::api::core::v1::{ResourceRequirements, ServicePort};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::instance::{DESCRIPTION_KEY, Instance};
use crate::resources::{NAME_LABEL, ResourceWrapper};

/// Transport protocol of an exposed port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PortProtocol {
    Tcp,
    Udp,
}

impl PortProtocol {
    pub fn as_str(self) -> &'static str {
        match self {
            PortProtocol::Tcp => "TCP",
            PortProtocol::Udp => "UDP",
        }
    }
}

/// One port exposed by an instance's service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub protocol: PortProtocol,
    pub container_port: i32,
    /// Port allocated on the nodes, assigned by the cluster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_port: Option<i32>,
}

/// How the pods of an instance are restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartBehavior {
    None,
    OnFailure,
    UnlessStopped,
    Always,
}

impl RestartBehavior {
    pub fn restart_policy(self) -> &'static str {
        match self {
            RestartBehavior::None => "Never",
            RestartBehavior::OnFailure | RestartBehavior::UnlessStopped => "OnFailure",
            RestartBehavior::Always => "Always",
        }
    }

    /// Maps a pod restart policy back, an unset policy is the cluster default `Always`.
    pub fn from_restart_policy(policy: Option<&str>) -> RestartBehavior {
        match policy {
            Some("Never") => RestartBehavior::None,
            Some("OnFailure") => RestartBehavior::OnFailure,
            _ => RestartBehavior::Always,
        }
    }
}

/// Field level changes applied by `configure`.
///
/// Absent fields, empty strings and empty collections leave the current value in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigurationPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub ports: Option<Vec<PortMapping>>,
    /// Memory limit in bytes.
    pub memory_limit: Option<u64>,
    pub startup_args: Option<String>,
    pub restart_behavior: Option<RestartBehavior>,
    pub environment: Option<BTreeMap<String, String>>,
}

impl ConfigurationPatch {
    pub fn is_empty(&self) -> bool {
        self == &ConfigurationPatch::default()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

impl Instance {
    /// Applies `patch` in place. Only the objects held by this value are touched.
    pub fn apply(&mut self, patch: &ConfigurationPatch) {
        if let Some(name) = non_empty(&patch.name) {
            self.deployment.set_label(NAME_LABEL, name);
        }

        if let Some(description) = non_empty(&patch.description) {
            self.config_map
                .data_mut()
                .insert(DESCRIPTION_KEY.to_owned(), description.to_owned());
        }

        if let Some(ports) = patch.ports.as_ref().filter(|ports| !ports.is_empty()) {
            self.set_ports(ports);
        }

        if let Some(limit) = patch.memory_limit.filter(|limit| *limit > 0) {
            self.set_memory_limit(limit);
        }

        if let Some(args) = non_empty(&patch.startup_args) {
            self.set_startup_args(args);
        }

        if let Some(behavior) = patch.restart_behavior {
            self.deployment.set_restart_policy(behavior.restart_policy());
        }

        if let Some(environment) = patch.environment.as_ref().filter(|env| !env.is_empty()) {
            self.set_environment(environment);
        }
    }

    fn set_ports(&mut self, ports: &[PortMapping]) {
        let service_ports = ports
            .iter()
            .enumerate()
            .map(|(index, mapping)| ServicePort {
                name: Some(format!("frontend-manual-{index}")),
                protocol: Some(mapping.protocol.as_str().to_owned()),
                port: mapping.container_port,
                ..ServicePort::default()
            })
            .collect();
        self.service.set_ports(service_ports);
    }

    /// Rebuilds every container's resource requirements around the new memory limit,
    /// a memory request that could exceed it is dropped.
    fn set_memory_limit(&mut self, bytes: u64) {
        let quantity = Quantity(bytes.to_string());
        for container in self.deployment.containers_mut() {
            let current = container.resources.take().unwrap_or_default();

            let mut limits = current.limits.unwrap_or_default();
            limits.insert("memory".to_owned(), quantity.clone());

            let requests = current
                .requests
                .map(|mut requests| {
                    requests.remove("memory");
                    requests
                })
                .filter(|requests| !requests.is_empty());

            container.resources = Some(ResourceRequirements {
                limits: Some(limits),
                requests,
                ..current
            });
        }
    }

    fn set_startup_args(&mut self, args: &str) {
        if let Some(container) = self.deployment.containers_mut().first_mut() {
            container.args = Some(args.split_whitespace().map(str::to_owned).collect());
        }
    }

    /// Replaces the environment, the stored description survives.
    fn set_environment(&mut self, environment: &BTreeMap<String, String>) {
        let description = self.description().map(str::to_owned);

        let data = self.config_map.data_mut();
        data.clone_from(environment);
        data.remove(DESCRIPTION_KEY);
        if let Some(description) = description {
            data.insert(DESCRIPTION_KEY.to_owned(), description);
        }
    }
}

/// Parses a Kubernetes quantity into a whole number of bytes.
///
/// Supports plain integers, the binary suffixes `Ki` to `Ei`, the decimal suffixes
/// `k` to `E` and decimal exponents (`1e9`). Fractions round up.
pub fn parse_memory_quantity(quantity: &str) -> Option<u64> {
    let quantity = quantity.trim();
    let split = quantity
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(quantity.len());
    let (number, suffix) = quantity.split_at(split);
    let number: f64 = number.parse().ok()?;

    let multiplier: f64 = match suffix {
        "" => 1.0,
        "Ki" => 1024f64,
        "Mi" => 1024f64.powi(2),
        "Gi" => 1024f64.powi(3),
        "Ti" => 1024f64.powi(4),
        "Pi" => 1024f64.powi(5),
        "Ei" => 1024f64.powi(6),
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        "m" => 1e-3,
        exponent if exponent.starts_with(['e', 'E']) => {
            let exponent: i32 = exponent[1..].parse().ok()?;
            10f64.powi(exponent)
        }
        _ => return None,
    };

    let bytes = (number * multiplier).ceil();
    if !bytes.is_finite() || bytes < 0.0 || bytes > u64::MAX as f64 {
        return None;
    }

    Some(bytes as u64)
}
