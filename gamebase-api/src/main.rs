use gamebase_api::{config::ApiConfig, startup::Application};
use gamebase_config::{Environment, load_config};
use gamebase_telemetry::init_tracing;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let app_name = env!("CARGO_BIN_NAME");

    let _log_flusher = init_tracing(app_name)?;

    // Initialize Sentry before the async runtime starts
    let _sentry_guard = init_sentry()?;

    actix_web::rt::System::new().block_on(async_main())?;

    Ok(())
}

async fn async_main() -> anyhow::Result<()> {
    let config = load_config::<ApiConfig>()?;
    info!(
        host = config.application.host,
        port = config.application.port,
        templates = %config.templates.path.display(),
        namespace_prefix = config.cluster.namespace_prefix,
        "starting gamebase api",
    );

    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    Ok(())
}

fn init_sentry() -> anyhow::Result<Option<sentry::ClientInitGuard>> {
    if let Ok(config) = load_config::<ApiConfig>()
        && let Some(sentry_config) = &config.sentry
    {
        info!("Initializing Sentry with DSN");

        let environment = Environment::load()?;
        let guard = sentry::init(sentry::ClientOptions {
            dsn: Some(sentry_config.dsn.parse()?),
            environment: Some(environment.to_string().into()),
            traces_sample_rate: 1.0,
            send_default_pii: false,
            max_request_body_size: sentry::MaxRequestBodySize::Always,
            ..Default::default()
        });
        sentry::configure_scope(|scope| scope.set_tag("service", "api"));

        return Ok(Some(guard));
    }

    info!("Sentry not configured, skipping initialization");
    Ok(None)
}
