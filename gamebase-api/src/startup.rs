use std::{net::TcpListener, sync::Arc};

use actix_web::{App, HttpServer, dev::Server, web};
use tracing_actix_web::TracingLogger;

use crate::{
    authentication::{JwtAuthority, TokenVerifier},
    chain::{Authenticator, Parser, ProcessingChain, TenantResolver, Translator},
    config::ApiConfig,
    fleet::{FleetClient, TenantStore},
    k8s::{HttpK8sClient, K8sClient},
    routes::{
        game_servers::{
            configure_game_server, delete_game_server, deploy_game_server,
            read_all_game_servers, read_game_server, restart_game_server, start_game_server,
            stop_game_server,
        },
        health_check::health_check,
        templates::list_templates,
        users::{login, register, update_profile},
    },
    span_builder::ApiRootSpanBuilder,
    templates::TemplateRegistry,
};

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(config: ApiConfig) -> Result<Self, anyhow::Error> {
        let address = format!("{}:{}", config.application.host, config.application.port);
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();

        let templates = Arc::new(TemplateRegistry::load_all(&config.templates.path)?);
        let k8s_client = Arc::new(HttpK8sClient::new().await?) as Arc<dyn K8sClient>;

        let server = run(config, listener, k8s_client, templates).await?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

// The cluster client and the catalog are passed in so tests can supply an in-memory
// cluster and a temporary catalog.
pub async fn run(
    config: ApiConfig,
    listener: TcpListener,
    k8s_client: Arc<dyn K8sClient>,
    templates: Arc<TemplateRegistry>,
) -> Result<Server, anyhow::Error> {
    let tenants = Arc::new(TenantStore::new(k8s_client.clone(), &config.cluster));
    let authority = Arc::new(JwtAuthority::from_config(&config.authentication));
    let fleet = Arc::new(FleetClient::new(k8s_client, &config.cluster));

    let chain = ProcessingChain::new(
        Authenticator::new(
            authority.clone() as Arc<dyn TokenVerifier>,
            tenants.clone() as Arc<dyn TenantResolver>,
        ),
        Parser::new(templates.clone()),
        Translator::new(fleet, templates),
    );

    let chain = web::Data::new(chain);
    let tenants: web::Data<TenantStore> = tenants.into();
    let authority: web::Data<JwtAuthority> = authority.into();

    let server = HttpServer::new(move || {
        let tracing_logger = TracingLogger::<ApiRootSpanBuilder>::new();
        App::new()
            .wrap(
                sentry::integrations::actix::Sentry::builder()
                    .capture_server_errors(true)
                    .start_transaction(true)
                    .finish(),
            )
            .wrap(tracing_logger)
            .service(health_check)
            .service(
                web::scope("v1")
                    //users
                    .service(register)
                    .service(login)
                    .service(update_profile)
                    //templates
                    .service(list_templates)
                    //game servers
                    .service(read_all_game_servers)
                    .service(deploy_game_server)
                    .service(read_game_server)
                    .service(configure_game_server)
                    .service(start_game_server)
                    .service(stop_game_server)
                    .service(restart_game_server)
                    .service(delete_game_server),
            )
            .app_data(chain.clone())
            .app_data(tenants.clone())
            .app_data(authority.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
