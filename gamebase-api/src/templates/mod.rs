//! The catalog of game server templates.
//!
//! A template is a directory holding four manifests, see [`ResourceKind::manifest_file`].
//! Templates are read once at startup by [`TemplateRegistry::load_all`] and are immutable
//! afterwards.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Service};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::resources::{
    ConfigMapResource, DeploymentResource, ResourceError, ResourceKind, ResourceWrapper,
    ServiceResource, VolumeClaimResource,
};

mod registry;

pub use registry::TemplateRegistry;

#[derive(Debug, Error)]
pub enum TemplateLoadError {
    #[error("Failed to read the template root {path}: {source}")]
    ReadRoot { path: PathBuf, source: io::Error },

    #[error("Failed to read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Failed to parse {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("{path} declares kind {found:?}, expected {expected}")]
    KindMismatch {
        path: PathBuf,
        expected: ResourceKind,
        found: Option<String>,
    },

    #[error("Template {template} is invalid: {source}")]
    Invalid {
        template: String,
        source: ResourceError,
    },
}

/// A validated bundle of the four objects describing one class of game server.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    config_map: ConfigMapResource,
    volume_claim: VolumeClaimResource,
    deployment: DeploymentResource,
    service: ServiceResource,
}

impl Template {
    /// Assembles a template from parsed manifests, renaming every object for server
    /// side name generation and validating the result.
    pub fn from_manifests(
        name: impl Into<String>,
        config_map: ConfigMap,
        volume_claim: PersistentVolumeClaim,
        deployment: Deployment,
        service: Service,
    ) -> Result<Template, TemplateLoadError> {
        let mut template = Template {
            name: name.into(),
            config_map: ConfigMapResource::new(config_map),
            volume_claim: VolumeClaimResource::new(volume_claim),
            deployment: DeploymentResource::new(deployment),
            service: ServiceResource::new(service),
        };
        template.rename();
        template
            .validate()
            .map_err(|source| TemplateLoadError::Invalid {
                template: template.name.clone(),
                source,
            })?;

        Ok(template)
    }

    fn rename(&mut self) {
        self.config_map.rename(&self.name);
        self.volume_claim.rename(&self.name);
        self.deployment.rename(&self.name);
        self.service.rename(&self.name);
    }

    fn validate(&self) -> Result<(), ResourceError> {
        self.config_map.validate(&self.name)?;
        self.volume_claim.validate(&self.name)?;
        self.deployment.validate(&self.name)?;
        self.service.validate(&self.name)
    }

    pub fn name(&self) -> &str {
        &self.name
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

    pub fn service(&self) -> &ServiceResource {
        &self.service
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::fixtures as resource_fixtures;

    #[test]
    fn manifests_are_renamed_after_the_template() {
        let template = fixtures::template("echo");

        assert_eq!(template.name(), "echo");
        assert_eq!(
            template.service().object().metadata.generate_name.as_deref(),
            Some("echo-service-")
        );
        assert_eq!(template.deployment().name(), None);
    }

    #[test]
    fn template_with_empty_deployment_is_invalid() {
        let mut deployment = resource_fixtures::deployment("echo");
        deployment
            .spec
            .as_mut()
            .and_then(|spec| spec.template.spec.as_mut())
            .unwrap()
            .containers
            .clear();

        let result = Template::from_manifests(
            "echo",
            resource_fixtures::config_map("echo"),
            resource_fixtures::volume_claim("echo"),
            deployment,
            resource_fixtures::service("echo"),
        );

        assert!(matches!(
            result,
            Err(TemplateLoadError::Invalid {
                source: ResourceError::NoContainers,
                ..
            })
        ));
    }
}
