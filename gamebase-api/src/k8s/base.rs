use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v1::Scale;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Secret, Service};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors emitted by the Kubernetes integration.
#[derive(Debug, Error)]
pub enum K8sError {
    /// The addressed object does not exist.
    #[error("{kind} {name} was not found")]
    NotFound { kind: &'static str, name: String },

    /// An object with the same name already exists.
    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: &'static str, name: String },

    /// Any other error returned by the [`kube`] client, including unreachable clusters and
    /// optimistic concurrency conflicts.
    #[error("An error occurred with kube when dealing with K8s: {0}")]
    Kube(#[from] kube::Error),

    /// A serialization or deserialization error while building or parsing resources.
    #[error("An error occurred in serde when dealing with K8s: {0}")]
    Serde(#[from] serde_json::Error),

    /// The cluster returned an object without a name.
    #[error("The cluster returned a {kind} without a name")]
    Unnamed { kind: &'static str },

    /// The call did not complete before its deadline.
    #[error("The K8s call did not complete within {0:?}")]
    Timeout(Duration),
}

impl K8sError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, K8sError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, K8sError::AlreadyExists { .. })
    }
}

/// Runs a single cluster call bounded by `deadline`.
///
/// An elapsed deadline is reported as [`K8sError::Timeout`] so that callers handle it
/// exactly like an unreachable cluster.
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, K8sError>
where
    F: Future<Output = Result<T, K8sError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(K8sError::Timeout(deadline)),
    }
}

/// Client interface describing the Kubernetes operations used by the API.
///
/// Every object scoped call takes the namespace explicitly, the client itself is not
/// bound to a tenant. `label_selector` follows the Kubernetes selector syntax
/// (`key=value[,key=value]`), an empty selector matches every object.
///
/// `replace_*` calls submit the full object including its `resourceVersion`, which
/// makes the cluster reject writes based on a stale read.
#[async_trait]
pub trait K8sClient: Send + Sync {
    /// Creates a namespace, failing with [`K8sError::AlreadyExists`] if it is present.
    async fn create_namespace(&self, name: &str) -> Result<(), K8sError>;

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, K8sError>;

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret, K8sError>;

    async fn replace_secret(&self, namespace: &str, secret: &Secret)
    -> Result<Secret, K8sError>;

    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<(), K8sError>;

    async fn list_config_maps(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<ConfigMap>, K8sError>;

    async fn create_config_map(
        &self,
        namespace: &str,
        config_map: &ConfigMap,
    ) -> Result<ConfigMap, K8sError>;

    async fn replace_config_map(
        &self,
        namespace: &str,
        config_map: &ConfigMap,
    ) -> Result<ConfigMap, K8sError>;

    async fn delete_config_map(&self, namespace: &str, name: &str) -> Result<(), K8sError>;

    async fn list_volume_claims(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<PersistentVolumeClaim>, K8sError>;

    async fn create_volume_claim(
        &self,
        namespace: &str,
        volume_claim: &PersistentVolumeClaim,
    ) -> Result<PersistentVolumeClaim, K8sError>;

    async fn replace_volume_claim(
        &self,
        namespace: &str,
        volume_claim: &PersistentVolumeClaim,
    ) -> Result<PersistentVolumeClaim, K8sError>;

    async fn delete_volume_claim(&self, namespace: &str, name: &str) -> Result<(), K8sError>;

    async fn list_deployments(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Deployment>, K8sError>;

    async fn create_deployment(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, K8sError>;

    async fn replace_deployment(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, K8sError>;

    async fn delete_deployment(&self, namespace: &str, name: &str) -> Result<(), K8sError>;

    /// Reads the `scale` subresource of a deployment.
    async fn get_deployment_scale(&self, namespace: &str, name: &str)
    -> Result<Scale, K8sError>;

    /// Writes the `scale` subresource of a deployment.
    async fn replace_deployment_scale(
        &self,
        namespace: &str,
        name: &str,
        scale: &Scale,
    ) -> Result<Scale, K8sError>;

    async fn list_services(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Service>, K8sError>;

    async fn create_service(&self, namespace: &str, service: &Service)
    -> Result<Service, K8sError>;

    async fn replace_service(
        &self,
        namespace: &str,
        service: &Service,
    ) -> Result<Service, K8sError>;

    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), K8sError>;
}
