use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use std::collections::BTreeMap;

use crate::resources::{ResourceError, ResourceKind, ResourceWrapper};

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResource(Service);

impl ServiceResource {
    pub fn new(service: Service) -> Self {
        Self(service)
    }

    pub fn ports(&self) -> &[ServicePort] {
        self.0
            .spec
            .as_ref()
            .and_then(|spec| spec.ports.as_deref())
            .unwrap_or_default()
    }

    pub fn set_ports(&mut self, ports: Vec<ServicePort>) {
        self.spec_mut().ports = Some(ports);
    }

    pub fn selector(&self) -> Option<&BTreeMap<String, String>> {
        self.0.spec.as_ref()?.selector.as_ref()
    }

    /// Replaces the pod selector so it matches `labels` exactly.
    pub fn set_selector(&mut self, labels: BTreeMap<String, String>) {
        self.spec_mut().selector = Some(labels);
    }

    fn spec_mut(&mut self) -> &mut ServiceSpec {
        self.0.spec.get_or_insert_with(ServiceSpec::default)
    }
}

impl ResourceWrapper for ServiceResource {
    type Object = Service;

    const KIND: ResourceKind = ResourceKind::Service;

    fn object(&self) -> &Service {
        &self.0
    }

    fn object_mut(&mut self) -> &mut Service {
        &mut self.0
    }

    fn validate_spec(&self) -> Result<(), ResourceError> {
        if self.ports().is_empty() {
            return Err(ResourceError::NoPorts);
        }

        match self.selector() {
            Some(selector) if !selector.is_empty() => Ok(()),
            _ => Err(ResourceError::EmptySelector),
        }
    }
}
