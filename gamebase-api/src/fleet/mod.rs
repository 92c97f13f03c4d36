//! Cluster side lifecycle of game servers and tenants.
//!
//! [`FleetClient`] treats the four objects of an instance as one entity addressed by
//! its identity label. The cluster offers no transactions across objects, multi object
//! operations therefore run as ordered steps and report exactly which steps completed
//! through [`PartialFailure`].

use kube::ResourceExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use gamebase_config::shared::ClusterConfig;

use crate::instance::{ConfigurationPatch, Instance, instantiate};
use crate::k8s::{K8sClient, K8sError, with_deadline};
use crate::resources::{
    CONFIG_MAP_PLACEHOLDER, DeploymentResource, IDENTITY_LABEL, ResourceKind, ResourceWrapper,
    VOLUME_CLAIM_PLACEHOLDER, identity_selector,
};
use crate::templates::Template;

mod error;
mod tenants;

pub use error::{FleetError, FleetOperation, PartialFailure};
pub use tenants::{ProfileUpdate, Registration, Tenant, TenantStore, encode_email};

/// Result of [`FleetClient::restart`].
#[derive(Debug, Clone)]
pub struct RestartOutcome {
    pub instance: Instance,
    /// Whether the stop phase observed zero replicas before the grace period ran out.
    pub stop_confirmed: bool,
}

/// Performs game server operations inside tenant namespaces.
pub struct FleetClient {
    k8s_client: Arc<dyn K8sClient>,
    request_timeout: Duration,
    restart_poll_interval: Duration,
    default_grace_period: Duration,
}

impl FleetClient {
    pub fn new(k8s_client: Arc<dyn K8sClient>, config: &ClusterConfig) -> FleetClient {
        FleetClient {
            k8s_client,
            request_timeout: config.request_timeout(),
            restart_poll_interval: config.restart_poll_interval(),
            default_grace_period: config.default_termination_grace_period(),
        }
    }

    async fn call<T, F>(&self, call: F) -> Result<T, K8sError>
    where
        F: Future<Output = Result<T, K8sError>>,
    {
        with_deadline(self.request_timeout, call).await
    }

    /// Runs a label selector lookup that must match exactly one object.
    async fn single<K, F>(
        &self,
        namespace: &str,
        identity: &str,
        kind: ResourceKind,
        lookup: F,
    ) -> Result<K, FleetError>
    where
        F: Future<Output = Result<Vec<K>, K8sError>>,
    {
        let mut objects = self.call(lookup).await?;
        match objects.len() {
            0 => Err(FleetError::NotFound {
                namespace: namespace.to_owned(),
                identity: identity.to_owned(),
                kind,
            }),
            1 => Ok(objects.remove(0)),
            count => Err(FleetError::Consistency {
                namespace: namespace.to_owned(),
                identity: identity.to_owned(),
                kind,
                count,
            }),
        }
    }

    /// Lists every game server in `namespace`.
    ///
    /// Deployments without an identity label are skipped. So are identities missing one
    /// of their objects, which is the state left behind by a partial deploy or delete.
    pub async fn list(&self, namespace: &str) -> Result<Vec<Instance>, FleetError> {
        let deployments = self
            .call(self.k8s_client.list_deployments(namespace, ""))
            .await?;

        let mut instances = Vec::with_capacity(deployments.len());
        for deployment in deployments {
            let Some(identity) = deployment.labels().get(IDENTITY_LABEL) else {
                warn!(
                    namespace,
                    deployment = %deployment.name_any(),
                    "skipping deployment without an identity label"
                );
                continue;
            };

            match self.get(namespace, identity).await {
                Ok(instance) => instances.push(instance),
                Err(FleetError::NotFound { kind, .. }) => {
                    warn!(namespace, %identity, %kind, "skipping incomplete game server");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(instances)
    }

    /// Resolves the four objects labelled with `identity`.
    pub async fn get(&self, namespace: &str, identity: &str) -> Result<Instance, FleetError> {
        let selector = identity_selector(identity);
        let client = &self.k8s_client;

        let (config_map, volume_claim, deployment, service) = tokio::try_join!(
            self.single(
                namespace,
                identity,
                ResourceKind::ConfigMap,
                client.list_config_maps(namespace, &selector),
            ),
            self.single(
                namespace,
                identity,
                ResourceKind::VolumeClaim,
                client.list_volume_claims(namespace, &selector),
            ),
            self.single(
                namespace,
                identity,
                ResourceKind::Deployment,
                client.list_deployments(namespace, &selector),
            ),
            self.single(
                namespace,
                identity,
                ResourceKind::Service,
                client.list_services(namespace, &selector),
            ),
        )?;

        Ok(Instance::from_parts(
            identity,
            config_map,
            volume_claim,
            deployment,
            service,
        ))
    }

    /// Instantiates `template` and creates its objects in creation order.
    ///
    /// The deployment is submitted only after the config map and the volume claim exist,
    /// its placeholder references are pointed at their generated names first. A failed
    /// step stops the sequence, objects created before it are left in place.
    pub async fn deploy(
        &self,
        namespace: &str,
        template: &Template,
    ) -> Result<Instance, FleetError> {
        let instance = instantiate(template);
        let identity = instance.identity().to_owned();
        info!(namespace, %identity, template = template.name(), "deploying game server");

        let mut steps = Steps::new(FleetOperation::Deploy, &identity);
        let client = &self.k8s_client;

        let config_map = self
            .call(client.create_config_map(namespace, instance.config_map().object()))
            .await
            .map_err(|err| steps.fail(ResourceKind::ConfigMap, err))?;
        steps.complete(ResourceKind::ConfigMap);
        info!(namespace, %identity, name = %config_map.name_any(), "created config map");

        let volume_claim = self
            .call(client.create_volume_claim(namespace, instance.volume_claim().object()))
            .await
            .map_err(|err| steps.fail(ResourceKind::VolumeClaim, err))?;
        steps.complete(ResourceKind::VolumeClaim);
        info!(namespace, %identity, name = %volume_claim.name_any(), "created volume claim");

        // The deployment cannot be submitted without the generated names it refers to.
        let config_map_name = created_name(&config_map, ResourceKind::ConfigMap)
            .map_err(|err| steps.fail(ResourceKind::Deployment, err))?;
        let volume_claim_name = created_name(&volume_claim, ResourceKind::VolumeClaim)
            .map_err(|err| steps.fail(ResourceKind::Deployment, err))?;
        let mut deployment = instance.deployment().clone();
        deployment.rewrite_config_map_references(CONFIG_MAP_PLACEHOLDER, config_map_name);
        deployment.rewrite_volume_claim_references(VOLUME_CLAIM_PLACEHOLDER, volume_claim_name);
        let deployment = self
            .call(client.create_deployment(namespace, deployment.object()))
            .await
            .map_err(|err| steps.fail(ResourceKind::Deployment, err))?;
        steps.complete(ResourceKind::Deployment);
        info!(namespace, %identity, name = %deployment.name_any(), "created deployment");

        let service = self
            .call(client.create_service(namespace, instance.service().object()))
            .await
            .map_err(|err| steps.fail(ResourceKind::Service, err))?;
        info!(namespace, %identity, name = %service.name_any(), "created service");

        Ok(Instance::from_parts(
            identity,
            config_map,
            volume_claim,
            deployment,
            service,
        ))
    }

    /// Applies `patch` to the current state of `identity` and updates the objects it
    /// changed, in creation order.
    pub async fn configure(
        &self,
        namespace: &str,
        identity: &str,
        patch: &ConfigurationPatch,
    ) -> Result<Instance, FleetError> {
        let current = self.get(namespace, identity).await?;
        let mut desired = current.clone();
        desired.apply(patch);

        let mut steps = Steps::new(FleetOperation::Configure, identity);
        let client = &self.k8s_client;

        let config_map = if desired.config_map() == current.config_map() {
            current.config_map().object().clone()
        } else {
            let updated = self
                .call(client.replace_config_map(namespace, desired.config_map().object()))
                .await
                .map_err(|err| steps.fail(ResourceKind::ConfigMap, err))?;
            info!(namespace, identity, name = %updated.name_any(), "updated config map");
            updated
        };
        steps.complete(ResourceKind::ConfigMap);

        let volume_claim = if desired.volume_claim() == current.volume_claim() {
            current.volume_claim().object().clone()
        } else {
            let updated = self
                .call(client.replace_volume_claim(namespace, desired.volume_claim().object()))
                .await
                .map_err(|err| steps.fail(ResourceKind::VolumeClaim, err))?;
            info!(namespace, identity, name = %updated.name_any(), "updated volume claim");
            updated
        };
        steps.complete(ResourceKind::VolumeClaim);

        let deployment = if desired.deployment() == current.deployment() {
            current.deployment().object().clone()
        } else {
            let updated = self
                .call(client.replace_deployment(namespace, desired.deployment().object()))
                .await
                .map_err(|err| steps.fail(ResourceKind::Deployment, err))?;
            info!(namespace, identity, name = %updated.name_any(), "updated deployment");
            updated
        };
        steps.complete(ResourceKind::Deployment);

        let service = if desired.service() == current.service() {
            current.service().object().clone()
        } else {
            let updated = self
                .call(client.replace_service(namespace, desired.service().object()))
                .await
                .map_err(|err| steps.fail(ResourceKind::Service, err))?;
            info!(namespace, identity, name = %updated.name_any(), "updated service");
            updated
        };

        Ok(Instance::from_parts(
            identity,
            config_map,
            volume_claim,
            deployment,
            service,
        ))
    }

    /// Sets the declared replica count of the game server's deployment.
    pub async fn rescale(
        &self,
        namespace: &str,
        identity: &str,
        replicas: i32,
    ) -> Result<(), FleetError> {
        let instance = self.get(namespace, identity).await?;
        let name = instance
            .deployment()
            .name()
            .ok_or(FleetError::MissingName(ResourceKind::Deployment))?;

        self.scale_deployment(namespace, name, replicas).await?;
        info!(namespace, identity, replicas, "rescaled game server");

        Ok(())
    }

    async fn scale_deployment(
        &self,
        namespace: &str,
        name: &str,
        replicas: i32,
    ) -> Result<(), K8sError> {
        let mut scale = self
            .call(self.k8s_client.get_deployment_scale(namespace, name))
            .await?;
        scale.spec.get_or_insert_with(Default::default).replicas = Some(replicas);
        self.call(self.k8s_client.replace_deployment_scale(namespace, name, &scale))
            .await?;

        Ok(())
    }

    /// Stops the game server, waits for its pods to be gone and starts it again.
    ///
    /// The wait is bounded by the pod termination grace period. When zero replicas are
    /// not observed in time the server is started anyway and the outcome reports
    /// `stop_confirmed: false`.
    pub async fn restart(
        &self,
        namespace: &str,
        identity: &str,
    ) -> Result<RestartOutcome, FleetError> {
        let instance = self.get(namespace, identity).await?;
        let grace_period = instance
            .termination_grace_period()
            .unwrap_or(self.default_grace_period);

        self.rescale(namespace, identity, 0).await?;

        let stop_confirmed = match tokio::time::timeout(
            grace_period,
            self.wait_until_stopped(namespace, identity),
        )
        .await
        {
            Ok(result) => {
                result?;
                true
            }
            Err(_) => {
                warn!(
                    namespace,
                    identity,
                    ?grace_period,
                    "game server did not stop within its grace period, starting it anyway"
                );
                false
            }
        };

        self.rescale(namespace, identity, 1).await?;
        let instance = self.get(namespace, identity).await?;
        info!(namespace, identity, stop_confirmed, "restarted game server");

        Ok(RestartOutcome {
            instance,
            stop_confirmed,
        })
    }

    async fn wait_until_stopped(
        &self,
        namespace: &str,
        identity: &str,
    ) -> Result<(), FleetError> {
        let selector = identity_selector(identity);
        loop {
            let deployment = self
                .single(
                    namespace,
                    identity,
                    ResourceKind::Deployment,
                    self.k8s_client.list_deployments(namespace, &selector),
                )
                .await?;

            let observed = DeploymentResource::new(deployment).observed_replicas();
            if observed == 0 {
                return Ok(());
            }

            debug!(namespace, identity, observed, "waiting for game server to stop");
            tokio::time::sleep(self.restart_poll_interval).await;
        }
    }

    /// Deletes the objects labelled with `identity`.
    ///
    /// Each kind is resolved on its own, so the leftovers of a partial deploy or delete
    /// can be removed by deleting again. Every kind is attempted even after a failure.
    /// A kind with no object left counts as deleted, the identity is unknown only when
    /// no kind has an object.
    pub async fn delete(&self, namespace: &str, identity: &str) -> Result<(), FleetError> {
        let selector = identity_selector(identity);
        let client = &self.k8s_client;

        let (config_maps, volume_claims, deployments, services) = tokio::try_join!(
            self.call(client.list_config_maps(namespace, &selector)),
            self.call(client.list_volume_claims(namespace, &selector)),
            self.call(client.list_deployments(namespace, &selector)),
            self.call(client.list_services(namespace, &selector)),
        )?;
        let found = [
            (ResourceKind::ConfigMap, object_names(&config_maps)),
            (ResourceKind::VolumeClaim, object_names(&volume_claims)),
            (ResourceKind::Deployment, object_names(&deployments)),
            (ResourceKind::Service, object_names(&services)),
        ];

        if found.iter().all(|(_, names)| names.is_empty()) {
            return Err(FleetError::NotFound {
                namespace: namespace.to_owned(),
                identity: identity.to_owned(),
                kind: ResourceKind::ConfigMap,
            });
        }
        if let Some((kind, names)) = found.iter().find(|(_, names)| names.len() > 1) {
            return Err(FleetError::Consistency {
                namespace: namespace.to_owned(),
                identity: identity.to_owned(),
                kind: *kind,
                count: names.len(),
            });
        }

        let mut completed = Vec::new();
        let mut failed = Vec::new();
        for (kind, names) in found {
            let Some(name) = names.into_iter().next() else {
                debug!(namespace, identity, %kind, "no object left to delete");
                completed.push(kind);
                continue;
            };

            let result = match (kind, name.as_deref()) {
                (_, None) => Err(K8sError::Unnamed {
                    kind: kind.api_kind(),
                }),
                (ResourceKind::ConfigMap, Some(name)) => {
                    self.call(client.delete_config_map(namespace, name)).await
                }
                (ResourceKind::VolumeClaim, Some(name)) => {
                    self.call(client.delete_volume_claim(namespace, name)).await
                }
                (ResourceKind::Deployment, Some(name)) => {
                    self.call(client.delete_deployment(namespace, name)).await
                }
                (ResourceKind::Service, Some(name)) => {
                    self.call(client.delete_service(namespace, name)).await
                }
            };
            let name = name.unwrap_or_default();

            match result {
                Ok(()) => {
                    info!(namespace, identity, %kind, %name, "deleted object");
                    completed.push(kind);
                }
                Err(err) if err.is_not_found() => {
                    debug!(namespace, identity, %kind, %name, "object was already deleted");
                    completed.push(kind);
                }
                Err(err) => {
                    warn!(
                        namespace,
                        identity,
                        %kind,
                        %name,
                        error = %err,
                        "failed to delete object"
                    );
                    failed.push((kind, err));
                }
            }
        }

        if failed.is_empty() {
            return Ok(());
        }

        if completed.is_empty() {
            let (_, err) = failed.remove(0);
            return Err(FleetError::Cluster(err));
        }

        Err(PartialFailure {
            operation: FleetOperation::Delete,
            identity: identity.to_owned(),
            completed,
            failed,
            not_attempted: vec![],
        }
        .into())
    }
}

fn created_name<K: kube::Resource>(object: &K, kind: ResourceKind) -> Result<&str, K8sError> {
    object.meta().name.as_deref().ok_or(K8sError::Unnamed {
        kind: kind.api_kind(),
    })
}

fn object_names<K: kube::Resource>(objects: &[K]) -> Vec<Option<String>> {
    objects
        .iter()
        .map(|object| object.meta().name.clone())
        .collect()
}

/// Progress of a sequential multi object operation.
struct Steps<'a> {
    operation: FleetOperation,
    identity: &'a str,
    completed: Vec<ResourceKind>,
}

impl<'a> Steps<'a> {
    fn new(operation: FleetOperation, identity: &'a str) -> Steps<'a> {
        Steps {
            operation,
            identity,
            completed: Vec::new(),
        }
    }

    fn complete(&mut self, kind: ResourceKind) {
        self.completed.push(kind);
    }

    /// Builds the error for a failed step, a failure of the first step is a plain
    /// cluster error.
    fn fail(&self, failed: ResourceKind, err: K8sError) -> FleetError {
        if self.completed.is_empty() {
            return FleetError::Cluster(err);
        }

        let failure = PartialFailure {
            operation: self.operation,
            identity: self.identity.to_owned(),
            completed: self.completed.clone(),
            failed: vec![(failed, err)],
            not_attempted: ResourceKind::ALL
                .into_iter()
                .filter(|kind| *kind > failed)
                .collect(),
        };
        warn!(error = %failure, "multi object operation partially failed");

        FleetError::PartialFailure(failure)
    }
}
