use k8s_openapi::api::core::v1::ConfigMap;
use std::collections::BTreeMap;

use crate::resources::{ResourceError, ResourceKind, ResourceWrapper};

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigMapResource(ConfigMap);

impl ConfigMapResource {
    pub fn new(config_map: ConfigMap) -> Self {
        Self(config_map)
    }

    pub fn data(&self) -> Option<&BTreeMap<String, String>> {
        self.0.data.as_ref()
    }

    pub fn data_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.0.data.get_or_insert_with(BTreeMap::new)
    }

    pub fn entry(&self, key: &str) -> Option<&str> {
        self.data()?.get(key).map(String::as_str)
    }
}

impl ResourceWrapper for ConfigMapResource {
    type Object = ConfigMap;

    const KIND: ResourceKind = ResourceKind::ConfigMap;

    fn object(&self) -> &ConfigMap {
        &self.0
    }

    fn object_mut(&mut self) -> &mut ConfigMap {
        &mut self.0
    }

    fn validate_spec(&self) -> Result<(), ResourceError> {
        match self.data() {
            Some(data) if !data.is_empty() => Ok(()),
            _ => Err(ResourceError::EmptyConfigData),
        }
    }
}
