use k8s_openapi::api::apps::v1::{Deployment, DeploymentCondition, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::resources::{ResourceError, ResourceKind, ResourceWrapper};

#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentResource(Deployment);

impl DeploymentResource {
    pub fn new(deployment: Deployment) -> Self {
        Self(deployment)
    }

    fn spec_mut(&mut self) -> &mut DeploymentSpec {
        self.0.spec.get_or_insert_with(DeploymentSpec::default)
    }

    fn pod_template(&self) -> Option<&PodTemplateSpec> {
        self.0.spec.as_ref().map(|spec| &spec.template)
    }

    pub fn pod_spec(&self) -> Option<&PodSpec> {
        self.pod_template()?.spec.as_ref()
    }

    pub fn pod_spec_mut(&mut self) -> &mut PodSpec {
        self.spec_mut()
            .template
            .spec
            .get_or_insert_with(PodSpec::default)
    }

    pub fn containers(&self) -> &[Container] {
        self.pod_spec()
            .map(|spec| spec.containers.as_slice())
            .unwrap_or_default()
    }

    pub fn containers_mut(&mut self) -> &mut Vec<Container> {
        &mut self.pod_spec_mut().containers
    }

    pub fn pod_labels(&self) -> BTreeMap<String, String> {
        self.pod_template()
            .and_then(|template| template.metadata.as_ref())
            .and_then(|meta| meta.labels.clone())
            .unwrap_or_default()
    }

    pub fn pod_labels_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.spec_mut()
            .template
            .metadata
            .get_or_insert_with(Default::default)
            .labels
            .get_or_insert_with(BTreeMap::new)
    }

    /// Makes the deployment select exactly the pods carrying `labels`.
    pub fn set_selector(&mut self, labels: BTreeMap<String, String>) {
        let selector = &mut self.spec_mut().selector;
        selector.match_labels = Some(labels);
        selector.match_expressions = None;
    }

    pub fn selector(&self) -> Option<&BTreeMap<String, String>> {
        self.0.spec.as_ref()?.selector.match_labels.as_ref()
    }

    /// Declared replica count, the cluster default of one applies when unset.
    pub fn replicas(&self) -> i32 {
        self.0
            .spec
            .as_ref()
            .and_then(|spec| spec.replicas)
            .unwrap_or(1)
    }

    /// Replica count last observed by the cluster.
    pub fn observed_replicas(&self) -> i32 {
        self.0
            .status
            .as_ref()
            .and_then(|status| status.replicas)
            .unwrap_or(0)
    }

    pub fn conditions(&self) -> &[DeploymentCondition] {
        self.0
            .status
            .as_ref()
            .and_then(|status| status.conditions.as_deref())
            .unwrap_or_default()
    }

    pub fn termination_grace_period(&self) -> Option<Duration> {
        self.pod_spec()?
            .termination_grace_period_seconds
            .map(|secs| Duration::from_secs(secs.max(0) as u64))
    }

    pub fn restart_policy(&self) -> Option<&str> {
        self.pod_spec()?.restart_policy.as_deref()
    }

    pub fn set_restart_policy(&mut self, policy: &str) {
        self.pod_spec_mut().restart_policy = Some(policy.to_owned());
    }

    /// Points every config map reference named `placeholder` at `actual`.
    ///
    /// Covers `envFrom`, `env[].valueFrom.configMapKeyRef` of regular and init
    /// containers as well as config map volumes.
    pub fn rewrite_config_map_references(&mut self, placeholder: &str, actual: &str) -> usize {
        let pod_spec = self.pod_spec_mut();
        let mut rewritten = 0;

        let init_containers = pod_spec.init_containers.iter_mut().flatten();
        for container in pod_spec.containers.iter_mut().chain(init_containers) {
            for source in container.env_from.iter_mut().flatten() {
                if let Some(config_map) = source.config_map_ref.as_mut() {
                    rewritten += rewrite_name(&mut config_map.name, placeholder, actual);
                }
            }
            for env in container.env.iter_mut().flatten() {
                let key_ref = env
                    .value_from
                    .as_mut()
                    .and_then(|source| source.config_map_key_ref.as_mut());
                if let Some(key_ref) = key_ref {
                    rewritten += rewrite_name(&mut key_ref.name, placeholder, actual);
                }
            }
        }

        for volume in pod_spec.volumes.iter_mut().flatten() {
            if let Some(config_map) = volume.config_map.as_mut() {
                rewritten += rewrite_name(&mut config_map.name, placeholder, actual);
            }
        }

        rewritten
    }

    /// Points every volume claim reference named `placeholder` at `actual`.
    pub fn rewrite_volume_claim_references(&mut self, placeholder: &str, actual: &str) -> usize {
        let mut rewritten = 0;
        for volume in self.pod_spec_mut().volumes.iter_mut().flatten() {
            if let Some(claim) = volume.persistent_volume_claim.as_mut() {
                rewritten += rewrite_name(&mut claim.claim_name, placeholder, actual);
            }
        }

        rewritten
    }
}

/// Object reference names are plain strings in current API versions and optional in
/// older ones.
trait ReferenceName {
    fn is(&self, name: &str) -> bool;

    fn replace_with(&mut self, name: &str);
}

impl ReferenceName for String {
    fn is(&self, name: &str) -> bool {
        self == name
    }

    fn replace_with(&mut self, name: &str) {
        name.clone_into(self);
    }
}

impl ReferenceName for Option<String> {
    fn is(&self, name: &str) -> bool {
        self.as_deref() == Some(name)
    }

    fn replace_with(&mut self, name: &str) {
        *self = Some(name.to_owned());
    }
}

fn rewrite_name<N: ReferenceName>(reference: &mut N, placeholder: &str, actual: &str) -> usize {
    if reference.is(placeholder) {
        reference.replace_with(actual);
        1
    } else {
        0
    }
}

impl ResourceWrapper for DeploymentResource {
    type Object = Deployment;

    const KIND: ResourceKind = ResourceKind::Deployment;

    fn object(&self) -> &Deployment {
        &self.0
    }

    fn object_mut(&mut self) -> &mut Deployment {
        &mut self.0
    }

    fn validate_spec(&self) -> Result<(), ResourceError> {
        if self.containers().is_empty() {
            return Err(ResourceError::NoContainers);
        }

        Ok(())
    }
}
