use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v1::Scale;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, PersistentVolumeClaim, Secret, Service};
use kube::api::{DeleteParams, ListParams, ObjectMeta, PostParams};
use kube::{Api, Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

use crate::k8s::{K8sClient, K8sError};

/// [`K8sClient`] implementation backed by [`kube`].
#[derive(Clone)]
pub struct HttpK8sClient {
    client: Client,
}

impl HttpK8sClient {
    /// Builds a client from the ambient Kubernetes configuration.
    pub async fn new() -> Result<HttpK8sClient, K8sError> {
        let client = Client::try_default().await?;

        Ok(HttpK8sClient { client })
    }

    fn namespaced<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Translates a [`kube::Error`] into the crate error, singling out the status codes
/// callers branch on.
fn map_kube_error(err: kube::Error, kind: &'static str, name: &str) -> K8sError {
    match &err {
        kube::Error::Api(response) if response.code == 404 => K8sError::NotFound {
            kind,
            name: name.to_owned(),
        },
        kube::Error::Api(response)
            if response.code == 409 && response.reason == "AlreadyExists" =>
        {
            K8sError::AlreadyExists {
                kind,
                name: name.to_owned(),
            }
        }
        _ => K8sError::Kube(err),
    }
}

/// Name used in error messages, objects created through `generateName` have no name yet.
fn display_name(meta: &ObjectMeta) -> String {
    meta.name
        .clone()
        .or_else(|| meta.generate_name.clone())
        .unwrap_or_default()
}

async fn list_objects<K>(api: Api<K>, label_selector: &str) -> Result<Vec<K>, K8sError>
where
    K: Clone + DeserializeOwned + Debug,
{
    let mut params = ListParams::default();
    if !label_selector.is_empty() {
        params = params.labels(label_selector);
    }

    Ok(api.list(&params).await?.items)
}

async fn create_object<K>(api: Api<K>, kind: &'static str, object: &K) -> Result<K, K8sError>
where
    K: Resource + Clone + DeserializeOwned + Serialize + Debug,
{
    let name = display_name(object.meta());
    let created = api
        .create(&PostParams::default(), object)
        .await
        .map_err(|err| map_kube_error(err, kind, &name))?;
    debug!(kind, name = %display_name(created.meta()), "created object");

    Ok(created)
}

async fn replace_object<K>(api: Api<K>, kind: &'static str, object: &K) -> Result<K, K8sError>
where
    K: Resource + Clone + DeserializeOwned + Serialize + Debug,
{
    let name = object.meta().name.clone().unwrap_or_default();
    api.replace(&name, &PostParams::default(), object)
        .await
        .map_err(|err| map_kube_error(err, kind, &name))
}

async fn delete_object<K>(api: Api<K>, kind: &'static str, name: &str) -> Result<(), K8sError>
where
    K: Clone + DeserializeOwned + Debug,
{
    api.delete(name, &DeleteParams::default())
        .await
        .map_err(|err| map_kube_error(err, kind, name))?;
    debug!(kind, name, "deleted object");

    Ok(())
}

#[async_trait]
impl K8sClient for HttpK8sClient {
    async fn create_namespace(&self, name: &str) -> Result<(), K8sError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_owned()),
                ..ObjectMeta::default()
            },
            ..Namespace::default()
        };
        create_object(api, "Namespace", &namespace).await?;

        Ok(())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, K8sError> {
        self.namespaced::<Secret>(namespace)
            .get(name)
            .await
            .map_err(|err| map_kube_error(err, "Secret", name))
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret, K8sError> {
        create_object(self.namespaced(namespace), "Secret", secret).await
    }

    async fn replace_secret(
        &self,
        namespace: &str,
        secret: &Secret,
    ) -> Result<Secret, K8sError> {
        replace_object(self.namespaced(namespace), "Secret", secret).await
    }

    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<(), K8sError> {
        delete_object(self.namespaced::<Secret>(namespace), "Secret", name).await
    }

    async fn list_config_maps(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<ConfigMap>, K8sError> {
        list_objects(self.namespaced(namespace), label_selector).await
    }

    async fn create_config_map(
        &self,
        namespace: &str,
        config_map: &ConfigMap,
    ) -> Result<ConfigMap, K8sError> {
        create_object(self.namespaced(namespace), "ConfigMap", config_map).await
    }

    async fn replace_config_map(
        &self,
        namespace: &str,
        config_map: &ConfigMap,
    ) -> Result<ConfigMap, K8sError> {
        replace_object(self.namespaced(namespace), "ConfigMap", config_map).await
    }

    async fn delete_config_map(&self, namespace: &str, name: &str) -> Result<(), K8sError> {
        delete_object(self.namespaced::<ConfigMap>(namespace), "ConfigMap", name).await
    }

    async fn list_volume_claims(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<PersistentVolumeClaim>, K8sError> {
        list_objects(self.namespaced(namespace), label_selector).await
    }

    async fn create_volume_claim(
        &self,
        namespace: &str,
        volume_claim: &PersistentVolumeClaim,
    ) -> Result<PersistentVolumeClaim, K8sError> {
        create_object(
            self.namespaced(namespace),
            "PersistentVolumeClaim",
            volume_claim,
        )
        .await
    }

    async fn replace_volume_claim(
        &self,
        namespace: &str,
        volume_claim: &PersistentVolumeClaim,
    ) -> Result<PersistentVolumeClaim, K8sError> {
        replace_object(
            self.namespaced(namespace),
            "PersistentVolumeClaim",
            volume_claim,
        )
        .await
    }

    async fn delete_volume_claim(&self, namespace: &str, name: &str) -> Result<(), K8sError> {
        delete_object(
            self.namespaced::<PersistentVolumeClaim>(namespace),
            "PersistentVolumeClaim",
            name,
        )
        .await
    }

    async fn list_deployments(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Deployment>, K8sError> {
        list_objects(self.namespaced(namespace), label_selector).await
    }

    async fn create_deployment(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, K8sError> {
        create_object(self.namespaced(namespace), "Deployment", deployment).await
    }

    async fn replace_deployment(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, K8sError> {
        replace_object(self.namespaced(namespace), "Deployment", deployment).await
    }

    async fn delete_deployment(&self, namespace: &str, name: &str) -> Result<(), K8sError> {
        delete_object(self.namespaced::<Deployment>(namespace), "Deployment", name).await
    }

    async fn get_deployment_scale(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Scale, K8sError> {
        self.namespaced::<Deployment>(namespace)
            .get_scale(name)
            .await
            .map_err(|err| map_kube_error(err, "Deployment", name))
    }

    async fn replace_deployment_scale(
        &self,
        namespace: &str,
        name: &str,
        scale: &Scale,
    ) -> Result<Scale, K8sError> {
        let data = serde_json::to_vec(scale)?;
        self.namespaced::<Deployment>(namespace)
            .replace_scale(name, &PostParams::default(), data)
            .await
            .map_err(|err| map_kube_error(err, "Deployment", name))
    }

    async fn list_services(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Service>, K8sError> {
        list_objects(self.namespaced(namespace), label_selector).await
    }

    async fn create_service(
        &self,
        namespace: &str,
        service: &Service,
    ) -> Result<Service, K8sError> {
        create_object(self.namespaced(namespace), "Service", service).await
    }

    async fn replace_service(
        &self,
        namespace: &str,
        service: &Service,
    ) -> Result<Service, K8sError> {
        replace_object(self.namespaced(namespace), "Service", service).await
    }

    async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), K8sError> {
        delete_object(self.namespaced::<Service>(namespace), "Service", name).await
    }
}
