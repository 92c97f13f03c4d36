use uuid::Uuid;

use crate::instance::Instance;
use crate::resources::{IDENTITY_LABEL, NAME_LABEL, ResourceWrapper};
use crate::templates::Template;

/// Creates a fresh instance of `template` under a newly generated identity.
pub fn instantiate(template: &Template) -> Instance {
    instantiate_with_identity(template, &Uuid::new_v4().to_string())
}

/// Creates an instance of `template` under `identity`.
///
/// The objects are cloned out of the template, labelled with the identity and the
/// selectors of the deployment and the service are derived from the pod labels.
pub fn instantiate_with_identity(template: &Template, identity: &str) -> Instance {
    let mut config_map = template.config_map().clone();
    let mut volume_claim = template.volume_claim().clone();
    let mut deployment = template.deployment().clone();
    let mut service = template.service().clone();

    deployment.set_label(NAME_LABEL, template.name());

    config_map.set_label(IDENTITY_LABEL, identity);
    volume_claim.set_label(IDENTITY_LABEL, identity);
    deployment.set_label(IDENTITY_LABEL, identity);
    service.set_label(IDENTITY_LABEL, identity);
    deployment
        .pod_labels_mut()
        .insert(IDENTITY_LABEL.to_owned(), identity.to_owned());

    let pod_labels = deployment.pod_labels();
    deployment.set_selector(pod_labels.clone());
    service.set_selector(pod_labels);

    Instance {
        identity: identity.to_owned(),
        config_map,
        volume_claim,
        deployment,
        service,
    }
}
