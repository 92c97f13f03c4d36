//! Deployed game servers and the views derived from their objects.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Service};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::resources::{
    ConfigMapResource, DeploymentResource, NAME_LABEL, ResourceWrapper, ServiceResource,
    TEMPLATE_LABEL, VolumeClaimResource,
};

mod configure;
pub mod factory;
mod status;

pub use configure::{
    ConfigurationPatch, PortMapping, PortProtocol, RestartBehavior, parse_memory_quantity,
};
pub use factory::instantiate;
pub use status::{InstanceStatus, derive_status};

/// Config map entry reserved for the instance description.
pub const DESCRIPTION_KEY: &str = "DESCRIPTION";

/// A uniquely identified game server made of four objects sharing one identity label.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    identity: String,
    config_map: ConfigMapResource,
    volume_claim: VolumeClaimResource,
    deployment: DeploymentResource,
    service: ServiceResource,
}

impl Instance {
    pub fn from_parts(
        identity: impl Into<String>,
        config_map: ConfigMap,
        volume_claim: PersistentVolumeClaim,
        deployment: Deployment,
        service: Service,
    ) -> Instance {
        Instance {
            identity: identity.into(),
            config_map: ConfigMapResource::new(config_map),
            volume_claim: VolumeClaimResource::new(volume_claim),
            deployment: DeploymentResource::new(deployment),
            service: ServiceResource::new(service),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn name(&self) -> &str {
        self.deployment.label(NAME_LABEL).unwrap_or_default()
    }

    pub fn template_name(&self) -> &str {
        self.deployment.label(TEMPLATE_LABEL).unwrap_or_default()
    }

    pub fn description(&self) -> Option<&str> {
        self.config_map.entry(DESCRIPTION_KEY)
    }

    pub fn status(&self) -> InstanceStatus {
        derive_status(&self.deployment)
    }

    pub fn ports(&self) -> Vec<PortMapping> {
        self.service
            .ports()
            .iter()
            .filter_map(|port| {
                let protocol = match port.protocol.as_deref() {
                    None | Some("TCP") => PortProtocol::Tcp,
                    Some("UDP") => PortProtocol::Udp,
                    Some(_) => return None,
                };
                Some(PortMapping {
                    protocol,
                    container_port: port.port,
                    node_port: port.node_port,
                })
            })
            .collect()
    }

    /// Memory limit of the game container in bytes.
    pub fn memory_limit(&self) -> Option<u64> {
        let container = self.deployment.containers().first()?;
        let limit = container.resources.as_ref()?.limits.as_ref()?.get("memory")?;

        parse_memory_quantity(&limit.0)
    }

    pub fn startup_args(&self) -> String {
        self.deployment
            .containers()
            .first()
            .and_then(|container| container.args.as_ref())
            .map(|args| args.join(" "))
            .unwrap_or_default()
    }

    pub fn restart_behavior(&self) -> RestartBehavior {
        RestartBehavior::from_restart_policy(self.deployment.restart_policy())
    }

    pub fn environment(&self) -> BTreeMap<String, String> {
        let mut environment = self.config_map.data().cloned().unwrap_or_default();
        environment.remove(DESCRIPTION_KEY);
        environment
    }

    pub fn termination_grace_period(&self) -> Option<Duration> {
        self.deployment.termination_grace_period()
    }

    pub fn config_map(&self) -> &ConfigMapResource {
        &self.config_map
    }

    pub fn volume_claim(&self) -> &VolumeClaimResource {
        &self.volume_claim
    }

    pub fn deployment(&self) -> &DeploymentResource {
        &self.deployment
    }

    pub fn deployment_mut(&mut self) -> &mut DeploymentResource {
        &mut self.deployment
    }

    pub fn service(&self) -> &ServiceResource {
        &self.service
    }
}
