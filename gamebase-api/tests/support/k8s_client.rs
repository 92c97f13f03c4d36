#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use gamebase_api::k8s::{K8sClient, K8sError};
use gamebase_api::resources::{IDENTITY_LABEL, ResourceKind};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentCondition, DeploymentStatus};
use k8s_openapi::api::autoscaling::v1::{Scale, ScaleSpec, ScaleStatus};
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Secret, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;

const NAME_SUFFIX_ALPHABET: &[u8] = b"bcdfghjklmnpqrstvwxz2456789";

/// Objects of one kind keyed by namespace and name.
type Store<K> = BTreeMap<(String, String), K>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Delete,
}

#[derive(Default)]
struct ClusterState {
    namespaces: BTreeSet<String>,
    secrets: Store<Secret>,
    config_maps: Store<ConfigMap>,
    volume_claims: Store<PersistentVolumeClaim>,
    deployments: Store<Deployment>,
    services: Store<Service>,
    failures: HashSet<(Action, ResourceKind)>,
    unnamed: HashSet<ResourceKind>,
    freeze_scale_down: bool,
}

/// An in-memory cluster.
///
/// Objects get a generated name when they only carry `generateName`, deployments report
/// their declared replicas as observed and an `Available` condition. Failures of
/// single kinds can be injected to exercise partial outcomes.
#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<ClusterState>,
}

impl FakeCluster {
    pub fn new() -> FakeCluster {
        FakeCluster::default()
    }

    fn state(&self) -> MutexGuard<'_, ClusterState> {
        self.state.lock().expect("cluster state lock poisoned")
    }

    /// Makes every following `action` on objects of `kind` fail.
    pub fn fail(&self, action: Action, kind: ResourceKind) {
        self.state().failures.insert((action, kind));
    }

    pub fn heal(&self) {
        self.state().failures.clear();
    }

    /// Created objects of `kind` are stored under their name but returned without one.
    pub fn return_unnamed(&self, kind: ResourceKind) {
        self.state().unnamed.insert(kind);
    }

    /// Deployments scaled to zero keep reporting their previous observed replicas.
    pub fn freeze_scale_down(&self) {
        self.state().freeze_scale_down = true;
    }

    pub fn has_namespace(&self, name: &str) -> bool {
        self.state().namespaces.contains(name)
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.state()
            .secrets
            .get(&(namespace.to_owned(), name.to_owned()))
            .cloned()
    }

    /// Number of objects of `kind` in `namespace`.
    pub fn count(&self, namespace: &str, kind: ResourceKind) -> usize {
        let state = self.state();
        match kind {
            ResourceKind::ConfigMap => count_in(&state.config_maps, namespace),
            ResourceKind::VolumeClaim => count_in(&state.volume_claims, namespace),
            ResourceKind::Deployment => count_in(&state.deployments, namespace),
            ResourceKind::Service => count_in(&state.services, namespace),
        }
    }

    pub fn config_maps(&self, namespace: &str) -> Vec<ConfigMap> {
        matching(&self.state().config_maps, namespace, "")
    }

    pub fn deployments(&self, namespace: &str) -> Vec<Deployment> {
        matching(&self.state().deployments, namespace, "")
    }

    /// Copies the service of `identity` under a new name, leaving two services that
    /// carry the same identity label.
    pub fn duplicate_service(&self, namespace: &str, identity: &str) {
        let mut state = self.state();
        let selector = format!("{IDENTITY_LABEL}={identity}");
        let mut copy = matching(&state.services, namespace, &selector)
            .pop()
            .expect("no service carries the identity");
        let name = format!("{}copy", copy.meta().name.clone().unwrap_or_default());
        copy.meta_mut().name = Some(name.clone());
        state.services.insert((namespace.to_owned(), name), copy);
    }

    /// Removes the objects of `kind` labelled with `identity`, bypassing failure injection.
    pub fn remove(&self, namespace: &str, kind: ResourceKind, identity: &str) {
        let mut state = self.state();
        let selector = format!("{IDENTITY_LABEL}={identity}");
        match kind {
            ResourceKind::ConfigMap => {
                remove_matching(&mut state.config_maps, namespace, &selector)
            }
            ResourceKind::VolumeClaim => {
                remove_matching(&mut state.volume_claims, namespace, &selector)
            }
            ResourceKind::Deployment => {
                remove_matching(&mut state.deployments, namespace, &selector)
            }
            ResourceKind::Service => remove_matching(&mut state.services, namespace, &selector),
        }
    }

    /// Stores a deployment as is, e.g. one without an identity label.
    pub fn insert_deployment(&self, namespace: &str, deployment: Deployment) {
        let name = deployment.meta().name.clone().unwrap_or_default();
        self.state()
            .deployments
            .insert((namespace.to_owned(), name), deployment);
    }

    fn created<K: Resource>(&self, kind: ResourceKind, mut object: K) -> K {
        if self.state().unnamed.contains(&kind) {
            object.meta_mut().name = None;
        }

        object
    }

    fn check(&self, action: Action, kind: ResourceKind) -> Result<(), K8sError> {
        if self.state().failures.contains(&(action, kind)) {
            return Err(K8sError::Timeout(Duration::from_secs(1)));
        }

        Ok(())
    }
}

fn count_in<K>(store: &Store<K>, namespace: &str) -> usize {
    store.keys().filter(|(ns, _)| ns == namespace).count()
}

/// Whether `labels` satisfy a comma separated list of `key=value` requirements.
fn selects(selector: &str, labels: Option<&BTreeMap<String, String>>) -> bool {
    selector
        .split(',')
        .filter(|requirement| !requirement.is_empty())
        .all(|requirement| {
            let Some((key, value)) = requirement.split_once('=') else {
                return false;
            };
            labels.and_then(|labels| labels.get(key)).map(String::as_str) == Some(value)
        })
}

fn matching<K>(store: &Store<K>, namespace: &str, selector: &str) -> Vec<K>
where
    K: Resource + Clone,
{
    store
        .iter()
        .filter(|((ns, _), object)| {
            ns == namespace && selects(selector, object.meta().labels.as_ref())
        })
        .map(|(_, object)| object.clone())
        .collect()
}

fn remove_matching<K>(store: &mut Store<K>, namespace: &str, selector: &str)
where
    K: Resource,
{
    store.retain(|(ns, _), object| {
        ns != namespace || !selects(selector, object.meta().labels.as_ref())
    });
}

fn generated_suffix() -> String {
    (0..5)
        .map(|_| {
            let index = rand::random_range(0..NAME_SUFFIX_ALPHABET.len());
            NAME_SUFFIX_ALPHABET[index] as char
        })
        .collect()
}

fn object_name(meta: &ObjectMeta) -> String {
    meta.name.clone().unwrap_or_default()
}

fn insert<K>(
    namespaces: &BTreeSet<String>,
    store: &mut Store<K>,
    kind: &'static str,
    namespace: &str,
    object: &K,
) -> Result<K, K8sError>
where
    K: Resource + Clone,
{
    if !namespaces.contains(namespace) {
        return Err(K8sError::NotFound {
            kind: "Namespace",
            name: namespace.to_owned(),
        });
    }

    let mut object = object.clone();
    let meta = object.meta_mut();
    if meta.name.is_none() {
        let prefix = meta.generate_name.clone().unwrap_or_default();
        meta.name = Some(format!("{prefix}{}", generated_suffix()));
    }
    meta.namespace = Some(namespace.to_owned());

    let key = (namespace.to_owned(), object_name(object.meta()));
    if store.contains_key(&key) {
        return Err(K8sError::AlreadyExists { kind, name: key.1 });
    }
    store.insert(key, object.clone());

    Ok(object)
}

fn replace<K>(
    store: &mut Store<K>,
    kind: &'static str,
    namespace: &str,
    object: &K,
) -> Result<K, K8sError>
where
    K: Resource + Clone,
{
    let key = (namespace.to_owned(), object_name(object.meta()));
    let Some(current) = store.get_mut(&key) else {
        return Err(K8sError::NotFound { kind, name: key.1 });
    };
    *current = object.clone();

    Ok(object.clone())
}

fn remove<K>(
    store: &mut Store<K>,
    kind: &'static str,
    namespace: &str,
    name: &str,
) -> Result<(), K8sError> {
    match store.remove(&(namespace.to_owned(), name.to_owned())) {
        Some(_) => Ok(()),
        None => Err(K8sError::NotFound {
            kind,
            name: name.to_owned(),
        }),
    }
}

fn available() -> Vec<DeploymentCondition> {
    vec![DeploymentCondition {
        type_: "Available".to_owned(),
        status: "True".to_owned(),
        reason: Some("MinimumReplicasAvailable".to_owned()),
        ..DeploymentCondition::default()
    }]
}

#[async_trait]
impl K8sClient for FakeCluster {
    async fn create_namespace(&self, name: &str) -> Result<(), K8sError> {
        if !self.state().namespaces.insert(name.to_owned()) {
            return Err(K8sError::AlreadyExists {
                kind: "Namespace",
                name: name.to_owned(),
            });
        }

        Ok(())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, K8sError> {
        self.secret(namespace, name).ok_or_else(|| K8sError::NotFound {
            kind: "Secret",
            name: name.to_owned(),
        })
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret, K8sError> {
        let mut guard = self.state();
        let state = &mut *guard;
        insert(&state.namespaces, &mut state.secrets, "Secret", namespace, secret)
    }

    async fn replace_secret(
        &self,
        namespace: &str,
        secret: &Secret,
    ) -> Result<Secret, K8sError> {
        replace(&mut self.state().secrets, "Secret", namespace, secret)
    }

    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<(), K8sError> {
        remove(&mut self.state().secrets, "Secret", namespace, name)
    }

    async fn list_config_maps(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<ConfigMap>, K8sError> {
        Ok(matching(&self.state().config_maps, namespace, label_selector))
    }

    async fn create_config_map(
        &self,
        namespace: &str,
        config_map: &ConfigMap,
    ) -> Result<ConfigMap, K8sError> {
        self.check(Action::Create, ResourceKind::ConfigMap)?;
        let created = {
            let mut guard = self.state();
            let state = &mut *guard;
            insert(
                &state.namespaces,
                &mut state.config_maps,
                "ConfigMap",
                namespace,
                config_map,
            )?
        };

        Ok(self.created(ResourceKind::ConfigMap, created))
    }

    async fn replace_config_map(
        &self,
        namespace: &str,
        config_map: &ConfigMap,
    ) -> Result<ConfigMap, K8sError> {
        replace(&mut self.state().config_maps, "ConfigMap", namespace, config_map)
    }

    async fn delete_config_map(&self, namespace: &str, name: &str) -> Result<(), K8sError> {
        self.check(Action::Delete, ResourceKind::ConfigMap)?;
        remove(&mut self.state().config_maps, "ConfigMap", namespace, name)
    }

    async fn list_volume_claims(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<PersistentVolumeClaim>, K8sError> {
        Ok(matching(&self.state().volume_claims, namespace, label_selector))
    }

    async fn create_volume_claim(
        &self,
        namespace: &str,
        volume_claim: &PersistentVolumeClaim,
    ) -> Result<PersistentVolumeClaim, K8sError> {
        self.check(Action::Create, ResourceKind::VolumeClaim)?;
        let created = {
            let mut guard = self.state();
            let state = &mut *guard;
            insert(
                &state.namespaces,
                &mut state.volume_claims,
                "PersistentVolumeClaim",
                namespace,
                volume_claim,
            )?
        };

        Ok(self.created(ResourceKind::VolumeClaim, created))
    }

    async fn replace_volume_claim(
        &self,
        namespace: &str,
        volume_claim: &PersistentVolumeClaim,
    ) -> Result<PersistentVolumeClaim, K8sError> {
        replace(
            &mut self.state().volume_claims,
            "PersistentVolumeClaim",
            namespace,
            volume_claim,
        )
    }

    async fn delete_volume_claim(&self, namespace: &str, name: &str) -> Result<(), K8sError> {
        self.check(Action::Delete, ResourceKind::VolumeClaim)?;
        remove(
            &mut self.state().volume_claims,
            "PersistentVolumeClaim",
            namespace,
            name,
        )
    }

    async fn list_deployments(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Deployment>, K8sError> {
        Ok(matching(&self.state().deployments, namespace, label_selector))
    }

    async fn create_deployment(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, K8sError> {
        self.check(Action::Create, ResourceKind::Deployment)?;
        let mut deployment = deployment.clone();
        let replicas = deployment
            .spec
            .as_ref()
            .and_then(|spec| spec.replicas)
            .unwrap_or(1);
        deployment.status = Some(DeploymentStatus {
            replicas: Some(replicas),
            conditions: Some(available()),
            ..DeploymentStatus::default()
        });

        let mut guard = self.state();
        let state = &mut *guard;
        insert(
            &state.namespaces,
            &mut state.deployments,
            "Deployment",
            namespace,
            &deployment,
        )
    }

    async fn replace_deployment(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, K8sError> {
        let mut state = self.state();
        let key = (namespace.to_owned(), object_name(deployment.meta()));
        let Some(current) = state.deployments.get_mut(&key) else {
            return Err(K8sError::NotFound {
                kind: "Deployment",
                name: key.1,
            });
        };

        // Status is owned by the cluster and survives a replace.
        let status = current.status.take();
        *current = deployment.clone();
        current.status = status;

        Ok(current.clone())
    }

    async fn delete_deployment(&self, namespace: &str, name: &str) -> Result<(), K8sError> {
        self.check(Action::Delete, ResourceKind::Deployment)?;
        remove(&mut self.state().deployments, "Deployment", namespace, name)
    }

    async fn get_deployment_scale(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Scale, K8sError> {
        let state = self.state();
        let deployment = state
            .deployments
            .get(&(namespace.to_owned(), name.to_owned()))
            .ok_or_else(|| K8sError::NotFound {
                kind: "Deployment",
                name: name.to_owned(),
            })?;

        Ok(Scale {
            metadata: ObjectMeta {
                name: Some(name.to_owned()),
                namespace: Some(namespace.to_owned()),
                ..ObjectMeta::default()
            },
            spec: Some(ScaleSpec {
                replicas: deployment.spec.as_ref().and_then(|spec| spec.replicas),
            }),
            status: Some(ScaleStatus {
                replicas: deployment
                    .status
                    .as_ref()
                    .and_then(|status| status.replicas)
                    .unwrap_or(0),
                ..ScaleStatus::default()
            }),
        })
    }

    async fn replace_deployment_scale(
        &self,
        namespace: &str,
        name: &str,
        scale: &Scale,
    ) -> Result<Scale, K8sError> {
        let mut state = self.state();
        let freeze_scale_down = state.freeze_scale_down;
        let deployment = state
            .deployments
            .get_mut(&(namespace.to_owned(), name.to_owned()))
            .ok_or_else(|| K8sError::NotFound {
                kind: "Deployment",
                name: name.to_owned(),
            })?;

        let replicas = scale
            .spec
            .as_ref()
            .and_then(|spec| spec.replicas)
            .unwrap_or(0);
        deployment.spec.get_or_insert_with(Default::default).replicas = Some(replicas);

        let status = deployment.status.get_or_insert_with(Default::default);
        if !(freeze_scale_down && replicas == 0) {
            status.replicas = Some(replicas);
        }
        if replicas > 0 {
            status.conditions = Some(available());
        }

        Ok(scale.clone())
    }

    async fn list_services(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Service>, K8sError> {
        Ok(matching(&self.state().services, namespace, label_selector))
    }

    async fn create_service(
        &self,
        namespace: &str,
        service: &Service,
    ) -> Result<Service, K8sError> {
        self.check(Action::Create, ResourceKind::Service)?;
        let mut guard = self.state();
        let state = &mut *guard;
        insert(
            &state.namespaces,
            &mut state.services,
            "Service",
            namespace,
            service,
        )
    }

    async fn replace_service(
        &self,
        namespace: &str,
        service: &Service,
    ) -> Result<Service, K8sError> {
        replace(&mut self.state().services, "Service", namespace, service)
    }

    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), K8sError> {
        self.check(Action::Delete, ResourceKind::Service)?;
        remove(&mut self.state().services, "Service", namespace, name)
    }
}
