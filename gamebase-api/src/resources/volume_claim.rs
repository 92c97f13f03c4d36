use k8s_openapi::api::core::v1::PersistentVolumeClaim;

use crate::resources::{ResourceError, ResourceKind, ResourceWrapper};

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeClaimResource(PersistentVolumeClaim);

impl VolumeClaimResource {
    pub fn new(volume_claim: PersistentVolumeClaim) -> Self {
        Self(volume_claim)
    }
}

impl ResourceWrapper for VolumeClaimResource {
    type Object = PersistentVolumeClaim;

    const KIND: ResourceKind = ResourceKind::VolumeClaim;

    fn object(&self) -> &PersistentVolumeClaim {
        &self.0
    }

    fn object_mut(&mut self) -> &mut PersistentVolumeClaim {
        &mut self.0
    }

    // Storage class and size are left to the cluster.
    fn validate_spec(&self) -> Result<(), ResourceError> {
        Ok(())
    }
}
