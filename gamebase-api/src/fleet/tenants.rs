use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use gamebase_config::shared::ClusterConfig;

use crate::credentials::{hash_password, verify_password};
use crate::fleet::FleetError;
use crate::k8s::{K8sClient, K8sError, with_deadline};

const UUID_FIELD: &str = "uuid";
const NAME_FIELD: &str = "name";
const PASSWORD_FIELD: &str = "password";

const EMAIL_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz123456";
const EMAIL_PADDING: char = '0';

/// Encodes an email address into a valid object name.
///
/// Base32 over a lowercase alphabet, padded with `0`.
pub fn encode_email(email: &str) -> String {
    let bytes = email.as_bytes();
    let mut encoded = String::with_capacity(bytes.len().div_ceil(5) * 8);

    for chunk in bytes.chunks(5) {
        let mut block = [0u8; 5];
        block[..chunk.len()].copy_from_slice(chunk);
        let bits = block
            .iter()
            .fold(0u64, |bits, byte| (bits << 8) | u64::from(*byte));

        let symbols = (chunk.len() * 8).div_ceil(5);
        for position in 0..8 {
            if position < symbols {
                let index = (bits >> (35 - position * 5)) & 0x1f;
                encoded.push(char::from(EMAIL_ALPHABET[index as usize]));
            } else {
                encoded.push(EMAIL_PADDING);
            }
        }
    }

    encoded
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A registered end user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant {
    pub email: String,
    pub name: String,
    pub namespace: String,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// Profile changes, empty fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

/// Tenant records, one secret per tenant in the shared namespace.
pub struct TenantStore {
    k8s_client: Arc<dyn K8sClient>,
    namespace_prefix: String,
    request_timeout: Duration,
}

impl TenantStore {
    pub fn new(k8s_client: Arc<dyn K8sClient>, config: &ClusterConfig) -> TenantStore {
        TenantStore {
            k8s_client,
            namespace_prefix: config.namespace_prefix.clone(),
            request_timeout: config.request_timeout(),
        }
    }

    async fn call<T, F>(&self, call: F) -> Result<T, K8sError>
    where
        F: Future<Output = Result<T, K8sError>>,
    {
        with_deadline(self.request_timeout, call).await
    }

    /// Namespace holding the tenant records.
    fn records_namespace(&self) -> &str {
        &self.namespace_prefix
    }

    pub fn tenant_namespace(&self, uuid: &str) -> String {
        format!("{}-user-{uuid}", self.namespace_prefix)
    }

    async fn ensure_namespace(&self, name: &str) -> Result<(), FleetError> {
        match self.call(self.k8s_client.create_namespace(name)).await {
            Ok(()) => {
                info!(namespace = name, "created namespace");
                Ok(())
            }
            Err(err) if err.is_already_exists() => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn read_record(&self, email: &str) -> Result<Secret, FleetError> {
        let name = encode_email(email);
        match self
            .call(self.k8s_client.get_secret(self.records_namespace(), &name))
            .await
        {
            Ok(secret) => Ok(secret),
            Err(err) if err.is_not_found() => {
                Err(FleetError::TenantNotFound(email.to_owned()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn tenant_from_record(&self, email: &str, record: &Secret) -> Result<Tenant, FleetError> {
        let uuid = field(record, UUID_FIELD).ok_or_else(|| FleetError::IncompleteTenant {
            email: email.to_owned(),
            field: UUID_FIELD,
        })?;

        Ok(Tenant {
            email: email.to_owned(),
            name: field(record, NAME_FIELD).unwrap_or_default(),
            namespace: self.tenant_namespace(&uuid),
        })
    }

    /// Registers a tenant.
    ///
    /// Every step tolerates objects left by an earlier attempt, so a failed registration
    /// can be retried with the same credentials. A record protected by a different
    /// password is never overwritten.
    pub async fn register(&self, registration: &Registration) -> Result<Tenant, FleetError> {
        let email = normalize_email(&registration.email);
        let records_namespace = self.records_namespace();
        self.ensure_namespace(records_namespace).await?;

        let record = Secret {
            metadata: ObjectMeta {
                name: Some(encode_email(&email)),
                ..ObjectMeta::default()
            },
            ..Secret::default()
        };
        match self
            .call(self.k8s_client.create_secret(records_namespace, &record))
            .await
        {
            Ok(_) => debug!(%email, "created tenant record"),
            Err(err) if err.is_already_exists() => {}
            Err(err) => return Err(err.into()),
        }

        let mut record = self.read_record(&email).await?;
        if let Some(stored) = field(&record, PASSWORD_FIELD)
            && !verify_password(&registration.password, &stored)?
        {
            return Err(FleetError::TenantExists(email));
        }

        if field(&record, UUID_FIELD).is_none() {
            set_field(&mut record, UUID_FIELD, &Uuid::new_v4().simple().to_string());
        }
        if !registration.name.is_empty() {
            set_field(&mut record, NAME_FIELD, &registration.name);
        }
        set_field(
            &mut record,
            PASSWORD_FIELD,
            &hash_password(&registration.password)?,
        );
        let record = self
            .call(self.k8s_client.replace_secret(records_namespace, &record))
            .await?;

        let tenant = self.tenant_from_record(&email, &record)?;
        self.ensure_namespace(&tenant.namespace).await?;
        info!(%email, namespace = %tenant.namespace, "registered tenant");

        Ok(tenant)
    }

    pub async fn tenant(&self, email: &str) -> Result<Tenant, FleetError> {
        let email = normalize_email(email);
        let record = self.read_record(&email).await?;

        self.tenant_from_record(&email, &record)
    }

    /// Resolves the namespace owned by the tenant registered as `email`.
    pub async fn resolve_namespace(&self, email: &str) -> Result<String, FleetError> {
        Ok(self.tenant(email).await?.namespace)
    }

    /// Checks `password` against the stored credential, unknown tenants never verify.
    pub async fn verify_credential(
        &self,
        email: &str,
        password: &str,
    ) -> Result<bool, FleetError> {
        let email = normalize_email(email);
        let record = match self.read_record(&email).await {
            Ok(record) => record,
            Err(FleetError::TenantNotFound(_)) => return Ok(false),
            Err(err) => return Err(err),
        };

        match field(&record, PASSWORD_FIELD) {
            Some(stored) => Ok(verify_password(password, &stored)?),
            None => Ok(false),
        }
    }

    /// Updates a tenant's profile.
    ///
    /// A new email moves the record: it is written under the new name with the same
    /// uuid, then the old record is deleted.
    pub async fn update_profile(
        &self,
        email: &str,
        update: &ProfileUpdate,
    ) -> Result<Tenant, FleetError> {
        let email = normalize_email(email);
        let records_namespace = self.records_namespace();
        let mut record = self.read_record(&email).await?;

        if let Some(name) = update.name.as_deref().filter(|name| !name.is_empty()) {
            set_field(&mut record, NAME_FIELD, name);
        }
        if let Some(password) = update.password.as_deref().filter(|pw| !pw.is_empty()) {
            set_field(&mut record, PASSWORD_FIELD, &hash_password(password)?);
        }

        let new_email = update
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|new_email| !new_email.is_empty() && *new_email != email);

        let Some(new_email) = new_email else {
            let record = self
                .call(self.k8s_client.replace_secret(records_namespace, &record))
                .await?;
            info!(%email, "updated tenant profile");
            return self.tenant_from_record(&email, &record);
        };

        let moved = Secret {
            metadata: ObjectMeta {
                name: Some(encode_email(&new_email)),
                ..ObjectMeta::default()
            },
            data: record.data.take(),
            ..Secret::default()
        };
        let moved = match self
            .call(self.k8s_client.create_secret(records_namespace, &moved))
            .await
        {
            Ok(moved) => moved,
            Err(err) if err.is_already_exists() => {
                return Err(FleetError::TenantExists(new_email));
            }
            Err(err) => return Err(err.into()),
        };
        self.call(
            self.k8s_client
                .delete_secret(records_namespace, &encode_email(&email)),
        )
        .await?;
        info!(old_email = %email, new_email = %new_email, "moved tenant record");

        self.tenant_from_record(&new_email, &moved)
    }
}

fn field(record: &Secret, key: &str) -> Option<String> {
    let value = record.data.as_ref()?.get(key)?;
    String::from_utf8(value.0.clone())
        .ok()
        .filter(|value| !value.is_empty())
}

fn set_field(record: &mut Secret, key: &str, value: &str) {
    record
        .data
        .get_or_insert_with(BTreeMap::new)
        .insert(key.to_owned(), ByteString(value.as_bytes().to_vec()));
}
