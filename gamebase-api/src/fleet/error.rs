use std::fmt;
use thiserror::Error;

use crate::credentials::CredentialError;
use crate::k8s::K8sError;
use crate::resources::ResourceKind;

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("Game server {identity} has no {kind} in namespace {namespace}")]
    NotFound {
        namespace: String,
        identity: String,
        kind: ResourceKind,
    },

    #[error(
        "Game server {identity} has {count} objects of kind {kind} in namespace {namespace}"
    )]
    Consistency {
        namespace: String,
        identity: String,
        kind: ResourceKind,
        count: usize,
    },

    #[error(transparent)]
    Cluster(#[from] K8sError),

    #[error(transparent)]
    PartialFailure(#[from] PartialFailure),

    #[error("The cluster returned a {0} without a name")]
    MissingName(ResourceKind),

    #[error("No tenant is registered for {0}")]
    TenantNotFound(String),

    #[error("A tenant is already registered for {0}")]
    TenantExists(String),

    #[error("The stored record of tenant {email} is incomplete: missing {field}")]
    IncompleteTenant { email: String, field: &'static str },

    #[error(transparent)]
    Credentials(#[from] CredentialError),
}

/// The multi object operation that partially failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FleetOperation {
    Deploy,
    Configure,
    Delete,
}

impl fmt::Display for FleetOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operation = match self {
            FleetOperation::Deploy => "deploy",
            FleetOperation::Configure => "configure",
            FleetOperation::Delete => "delete",
        };
        f.write_str(operation)
    }
}

/// A multi object operation that completed some but not all of its steps.
///
/// Nothing is rolled back, the report names the kinds that have to be reconciled.
#[derive(Debug, Error)]
#[error(
    "{operation} of game server {identity} partially failed: completed {}, failed {}, not attempted {}",
    list_kinds(.completed),
    list_failures(.failed),
    list_kinds(.not_attempted)
)]
pub struct PartialFailure {
    pub operation: FleetOperation,
    pub identity: String,
    pub completed: Vec<ResourceKind>,
    pub failed: Vec<(ResourceKind, K8sError)>,
    pub not_attempted: Vec<ResourceKind>,
}

fn list_kinds(kinds: &[ResourceKind]) -> String {
    let kinds: Vec<_> = kinds.iter().map(ResourceKind::to_string).collect();
    format!("[{}]", kinds.join(", "))
}

fn list_failures(failures: &[(ResourceKind, K8sError)]) -> String {
    let failures: Vec<_> = failures
        .iter()
        .map(|(kind, err)| format!("{kind}: {err}"))
        .collect();
    format!("[{}]", failures.join(", "))
}
