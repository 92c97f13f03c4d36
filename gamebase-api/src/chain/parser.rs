use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::chain::{ChainError, Command, Operation};
use crate::instance::{ConfigurationPatch, DESCRIPTION_KEY};
use crate::templates::TemplateRegistry;

/// Longest value the cluster accepts for a label.
const MAX_LABEL_VALUE_LEN: usize = 63;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeployRequest {
    #[serde(alias = "templatePath")]
    template: String,
}

/// Second stage: binds and validates the operation payload.
///
/// Nothing here reaches the cluster, a rejected request never causes a cluster call.
pub struct Parser {
    templates: Arc<TemplateRegistry>,
}

impl Parser {
    pub fn new(templates: Arc<TemplateRegistry>) -> Self {
        Self { templates }
    }

    /// Reads a raw payload as JSON, malformed input is a validation error.
    pub fn decode(raw: &[u8]) -> Result<serde_json::Value, ChainError> {
        serde_json::from_slice(raw)
            .map_err(|err| ChainError::Validation(format!("malformed request body: {err}")))
    }

    pub fn parse(
        &self,
        operation: Operation,
        identity: Option<String>,
        body: Option<serde_json::Value>,
    ) -> Result<Command, ChainError> {
        let command = match operation {
            Operation::ListTemplates => Command::ListTemplates,
            Operation::ListInstances => Command::ListInstances,
            Operation::GetInstance => Command::GetInstance {
                identity: parse_identity(identity)?,
            },
            Operation::DeployInstance => {
                let request: DeployRequest = parse_body(body)?;
                if self.templates.get(&request.template).is_none() {
                    return Err(ChainError::UnknownTemplate(request.template));
                }
                Command::DeployInstance {
                    template: request.template,
                }
            }
            Operation::ConfigureInstance => {
                let identity = parse_identity(identity)?;
                let patch: ConfigurationPatch = parse_body(body)?;
                validate_patch(&patch)?;
                Command::ConfigureInstance { identity, patch }
            }
            Operation::StartInstance => Command::StartInstance {
                identity: parse_identity(identity)?,
            },
            Operation::StopInstance => Command::StopInstance {
                identity: parse_identity(identity)?,
            },
            Operation::RestartInstance => Command::RestartInstance {
                identity: parse_identity(identity)?,
            },
            Operation::DeleteInstance => Command::DeleteInstance {
                identity: parse_identity(identity)?,
            },
        };

        Ok(command)
    }
}

fn parse_body<T: DeserializeOwned>(body: Option<serde_json::Value>) -> Result<T, ChainError> {
    let body = body.ok_or_else(|| ChainError::Validation("a request body is required".into()))?;

    serde_json::from_value(body).map_err(|err| ChainError::Validation(err.to_string()))
}

fn parse_identity(identity: Option<String>) -> Result<String, ChainError> {
    let identity = identity.unwrap_or_default();
    if identity.is_empty() || !is_label_value(&identity) {
        return Err(ChainError::Validation(format!(
            "{identity:?} is not a valid game server id"
        )));
    }

    Ok(identity)
}

/// Checks the cluster's label value syntax: up to 63 alphanumerics, `-`, `_` or `.`,
/// starting and ending with an alphanumeric. The empty value is allowed.
fn is_label_value(value: &str) -> bool {
    if value.is_empty() {
        return true;
    }

    let bytes = value.as_bytes();
    value.len() <= MAX_LABEL_VALUE_LEN
        && bytes[0].is_ascii_alphanumeric()
        && bytes[bytes.len() - 1].is_ascii_alphanumeric()
        && bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

fn is_config_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

fn validate_patch(patch: &ConfigurationPatch) -> Result<(), ChainError> {
    if let Some(name) = &patch.name
        && !is_label_value(name)
    {
        return Err(ChainError::Validation(format!(
            "{name:?} is not a valid server name"
        )));
    }

    for port in patch.ports.iter().flatten() {
        if !(1..=65535).contains(&port.container_port) {
            return Err(ChainError::Validation(format!(
                "port {} is out of range",
                port.container_port
            )));
        }
    }

    for key in patch.environment.iter().flat_map(|env| env.keys()) {
        if key == DESCRIPTION_KEY {
            return Err(ChainError::Validation(format!(
                "{DESCRIPTION_KEY} is reserved for the description"
            )));
        }
        if !is_config_key(key) {
            return Err(ChainError::Validation(format!(
                "{key:?} is not a valid environment variable name"
            )));
        }
    }

    Ok(())
}
