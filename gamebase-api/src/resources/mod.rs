//! Typed wrappers around the four Kubernetes objects that make up a game server.
//!
//! Every wrapper knows how to reset its object's naming for server side generation
//! ([`ResourceWrapper::rename`]) and how to check the structural rules a template
//! manifest must satisfy ([`ResourceWrapper::validate`]).

use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

mod config_map;
mod deployment;
mod service;
mod volume_claim;

pub use config_map::ConfigMapResource;
pub use deployment::DeploymentResource;
pub use service::ServiceResource;
pub use volume_claim::VolumeClaimResource;

/// Label carrying the identity shared by the four objects of an instance.
pub const IDENTITY_LABEL: &str = "deploymentUUID";
/// Label carrying the display name of an instance.
pub const NAME_LABEL: &str = "name";
/// Label carrying the name of the template an object was built from.
pub const TEMPLATE_LABEL: &str = "gameserver";
pub const DEPLOYMENT_TYPE_LABEL: &str = "deploymentType";
pub const DEPLOYMENT_TYPE_VALUE: &str = "gameserver";

/// Placeholder a template uses wherever it references its own config map.
pub const CONFIG_MAP_PLACEHOLDER: &str = "GameServerTemplateConfigMap";
/// Placeholder a template uses wherever it references its own volume claim.
pub const VOLUME_CLAIM_PLACEHOLDER: &str = "GameServerTemplatePersistentVolumeClaim";

/// The four kinds of objects composing a game server, in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    ConfigMap,
    VolumeClaim,
    Deployment,
    Service,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::ConfigMap,
        ResourceKind::VolumeClaim,
        ResourceKind::Deployment,
        ResourceKind::Service,
    ];

    /// Manifest file holding this kind inside a template directory.
    pub fn manifest_file(self) -> &'static str {
        match self {
            ResourceKind::ConfigMap => "0-configmap.yaml",
            ResourceKind::VolumeClaim => "1-pvc.yaml",
            ResourceKind::Deployment => "2-deployment.yaml",
            ResourceKind::Service => "3-service.yaml",
        }
    }

    /// The Kubernetes `kind` expected in the manifest.
    pub fn api_kind(self) -> &'static str {
        match self {
            ResourceKind::ConfigMap => "ConfigMap",
            ResourceKind::VolumeClaim => "PersistentVolumeClaim",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::Service => "Service",
        }
    }

    /// Short tag used in generated object names.
    pub fn tag(self) -> &'static str {
        match self {
            ResourceKind::ConfigMap => "configmap",
            ResourceKind::VolumeClaim => "pvc",
            ResourceKind::Deployment => "deployment",
            ResourceKind::Service => "service",
        }
    }

    /// The `generateName` prefix objects of this kind get for `template_name`.
    pub fn generate_name(self, template_name: &str) -> String {
        format!("{template_name}-{}-", self.tag())
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_kind())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("{kind} must have generateName {expected:?} and no fixed name")]
    Naming {
        kind: ResourceKind,
        expected: String,
    },

    #[error("{kind} is missing the label {label:?}")]
    MissingLabel {
        kind: ResourceKind,
        label: &'static str,
    },

    #[error("{kind} label {label:?} must be {expected:?}")]
    LabelValue {
        kind: ResourceKind,
        label: &'static str,
        expected: &'static str,
    },

    #[error("ConfigMap must carry at least one data entry")]
    EmptyConfigData,

    #[error("Deployment must declare at least one container")]
    NoContainers,

    #[error("Service must declare at least one port")]
    NoPorts,

    #[error("Service must declare a non-empty selector")]
    EmptySelector,
}

/// Shared behavior of the typed object wrappers.
pub trait ResourceWrapper {
    type Object: Resource;

    const KIND: ResourceKind;

    fn object(&self) -> &Self::Object;

    fn object_mut(&mut self) -> &mut Self::Object;

    /// Checks the kind specific structural rules.
    fn validate_spec(&self) -> Result<(), ResourceError>;

    fn name(&self) -> Option<&str> {
        self.object().meta().name.as_deref()
    }

    fn labels(&self) -> &BTreeMap<String, String> {
        self.object().labels()
    }

    fn labels_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.object_mut().labels_mut()
    }

    fn label(&self, key: &str) -> Option<&str> {
        self.labels().get(key).map(String::as_str)
    }

    fn set_label(&mut self, key: &str, value: impl Into<String>) {
        self.labels_mut().insert(key.to_owned(), value.into());
    }

    /// Clears the fixed name and lets the cluster generate one from the template name.
    fn rename(&mut self, template_name: &str) {
        let meta = self.object_mut().meta_mut();
        meta.name = None;
        meta.generate_name = Some(Self::KIND.generate_name(template_name));
    }

    /// Checks naming, required labels and the kind specific rules.
    fn validate(&self, template_name: &str) -> Result<(), ResourceError> {
        let expected = Self::KIND.generate_name(template_name);
        let meta = self.object().meta();
        if meta.name.is_some() || meta.generate_name.as_deref() != Some(expected.as_str()) {
            return Err(ResourceError::Naming {
                kind: Self::KIND,
                expected,
            });
        }

        if self.label(TEMPLATE_LABEL).is_none() {
            return Err(ResourceError::MissingLabel {
                kind: Self::KIND,
                label: TEMPLATE_LABEL,
            });
        }

        match self.label(DEPLOYMENT_TYPE_LABEL) {
            None => {
                return Err(ResourceError::MissingLabel {
                    kind: Self::KIND,
                    label: DEPLOYMENT_TYPE_LABEL,
                });
            }
            Some(value) if value != DEPLOYMENT_TYPE_VALUE => {
                return Err(ResourceError::LabelValue {
                    kind: Self::KIND,
                    label: DEPLOYMENT_TYPE_LABEL,
                    expected: DEPLOYMENT_TYPE_VALUE,
                });
            }
            Some(_) => {}
        }

        self.validate_spec()
    }
}

/// Builds the selector matching every object carrying `identity`.
pub fn identity_selector(identity: &str) -> String {
    format!("{IDENTITY_LABEL}={identity}")
}
