use std::sync::Arc;

use crate::chain::{ChainError, ChainResponse, Command, InstanceView, TenantContext};
use crate::fleet::FleetClient;
use crate::templates::TemplateRegistry;

/// Last stage: runs a command against the fleet and shapes the response.
pub struct Translator {
    fleet: Arc<FleetClient>,
    templates: Arc<TemplateRegistry>,
}

impl Translator {
    pub fn new(fleet: Arc<FleetClient>, templates: Arc<TemplateRegistry>) -> Self {
        Self { fleet, templates }
    }

    pub async fn translate(
        &self,
        tenant: &TenantContext,
        command: Command,
    ) -> Result<ChainResponse, ChainError> {
        let namespace = tenant.namespace.as_str();

        let response = match command {
            Command::ListTemplates => ChainResponse::Templates {
                templates: self.templates.names(),
            },
            Command::ListInstances => {
                let instances = self.fleet.list(namespace).await?;
                ChainResponse::Instances {
                    game_servers: instances.iter().map(InstanceView::from).collect(),
                }
            }
            Command::GetInstance { identity } => {
                let instance = self.fleet.get(namespace, &identity).await?;
                ChainResponse::Instance(InstanceView::from(&instance))
            }
            Command::DeployInstance { template } => {
                let template = self
                    .templates
                    .get(&template)
                    .ok_or(ChainError::UnknownTemplate(template))?;
                let instance = self.fleet.deploy(namespace, template).await?;
                ChainResponse::Instance(InstanceView::from(&instance))
            }
            Command::ConfigureInstance { identity, patch } => {
                let instance = self.fleet.configure(namespace, &identity, &patch).await?;
                ChainResponse::Instance(InstanceView::from(&instance))
            }
            Command::StartInstance { identity } => {
                self.fleet.rescale(namespace, &identity, 1).await?;
                ChainResponse::Done
            }
            Command::StopInstance { identity } => {
                self.fleet.rescale(namespace, &identity, 0).await?;
                ChainResponse::Done
            }
            Command::RestartInstance { identity } => {
                let outcome = self.fleet.restart(namespace, &identity).await?;
                ChainResponse::Restarted {
                    game_server: InstanceView::from(&outcome.instance),
                    stop_confirmed: outcome.stop_confirmed,
                }
            }
            Command::DeleteInstance { identity } => {
                self.fleet.delete(namespace, &identity).await?;
                ChainResponse::Done
            }
        };

        Ok(response)
    }
}
