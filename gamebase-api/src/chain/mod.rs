//! The request processing chain mediating every game server operation.
//!
//! A request passes three stages in order: the [`Authenticator`] turns the bearer
//! credential into a [`TenantContext`], the [`Parser`] turns the raw payload into a
//! validated [`Command`] and the [`Translator`] runs it against the fleet. Any stage
//! ends the chain early by returning a [`ChainError`]. Only the translator talks to
//! the cluster about game servers.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use crate::authentication::AuthenticationError;
use crate::fleet::FleetError;
use crate::instance::{
    ConfigurationPatch, Instance, InstanceStatus, PortMapping, RestartBehavior,
};

mod authenticator;
mod parser;
mod translator;

pub use authenticator::{Authenticator, TenantResolver};
pub use parser::Parser;
pub use translator::Translator;

/// The named operations exposed to the outer layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListTemplates,
    ListInstances,
    GetInstance,
    DeployInstance,
    ConfigureInstance,
    StartInstance,
    StopInstance,
    RestartInstance,
    DeleteInstance,
}

/// An unauthenticated, unparsed request as handed over by the outer layer.
#[derive(Debug, Clone)]
pub struct ChainRequest {
    pub credential: Option<String>,
    pub operation: Operation,
    pub identity: Option<String>,
    /// Raw JSON payload, bound by the parser once the credential is accepted.
    pub body: Option<Vec<u8>>,
}

impl ChainRequest {
    pub fn new(operation: Operation, credential: Option<String>) -> ChainRequest {
        ChainRequest {
            credential,
            operation,
            identity: None,
            body: None,
        }
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> ChainRequest {
        self.identity = Some(identity.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> ChainRequest {
        self.body = Some(body.into());
        self
    }
}

/// The authenticated tenant a request acts for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub email: String,
    pub namespace: String,
}

/// A validated operation ready to be translated into fleet calls.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ListTemplates,
    ListInstances,
    GetInstance { identity: String },
    DeployInstance { template: String },
    ConfigureInstance {
        identity: String,
        patch: ConfigurationPatch,
    },
    StartInstance { identity: String },
    StopInstance { identity: String },
    RestartInstance { identity: String },
    DeleteInstance { identity: String },
}

/// Externally visible state of a game server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceView {
    pub id: String,
    pub name: String,
    pub template: String,
    pub status: InstanceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub ports: Vec<PortMapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<u64>,
    pub startup_args: String,
    pub restart_behavior: RestartBehavior,
    pub environment: BTreeMap<String, String>,
}

impl From<&Instance> for InstanceView {
    fn from(instance: &Instance) -> Self {
        InstanceView {
            id: instance.identity().to_owned(),
            name: instance.name().to_owned(),
            template: instance.template_name().to_owned(),
            status: instance.status(),
            description: instance.description().map(str::to_owned),
            ports: instance.ports(),
            memory_limit: instance.memory_limit(),
            startup_args: instance.startup_args(),
            restart_behavior: instance.restart_behavior(),
            environment: instance.environment(),
        }
    }
}

/// Successful outcome of a chain run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChainResponse {
    Templates { templates: Vec<String> },
    Instances { game_servers: Vec<InstanceView> },
    Instance(InstanceView),
    Restarted {
        game_server: InstanceView,
        stop_confirmed: bool,
    },
    Done,
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthenticationError),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("The template {0} does not exist")]
    UnknownTemplate(String),

    #[error(transparent)]
    Fleet(#[from] FleetError),
}

impl ChainError {
    /// Stable machine readable class of the failure.
    pub fn classification(&self) -> &'static str {
        match self {
            ChainError::Unauthorized(_) => "unauthorized",
            ChainError::Validation(_) | ChainError::UnknownTemplate(_) => "validation_error",
            ChainError::Fleet(err) => match err {
                FleetError::NotFound { .. } | FleetError::TenantNotFound(_) => "not_found",
                FleetError::Consistency { .. } | FleetError::IncompleteTenant { .. } => {
                    "consistency_error"
                }
                FleetError::PartialFailure(_) => "partial_failure",
                FleetError::TenantExists(_) => "validation_error",
                FleetError::Cluster(_)
                | FleetError::MissingName(_)
                | FleetError::Credentials(_) => "cluster_error",
            },
        }
    }
}

/// Authenticator, parser and translator composed front to back.
pub struct ProcessingChain {
    authenticator: Authenticator,
    parser: Parser,
    translator: Translator,
}

impl ProcessingChain {
    pub fn new(authenticator: Authenticator, parser: Parser, translator: Translator) -> Self {
        Self {
            authenticator,
            parser,
            translator,
        }
    }

    pub async fn process(&self, request: ChainRequest) -> Result<ChainResponse, ChainError> {
        let ChainRequest {
            credential,
            operation,
            identity,
            body,
        } = request;

        let tenant = self.authenticator.authenticate(credential.as_deref()).await?;
        let body = body.as_deref().map(Parser::decode).transpose()?;
        let command = self.parser.parse(operation, identity, body)?;
        debug!(namespace = %tenant.namespace, ?operation, "processing game server request");

        self.translator.translate(&tenant, command).await
    }
}
