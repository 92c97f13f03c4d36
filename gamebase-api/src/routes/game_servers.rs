use actix_web::{
    HttpResponse, delete, get, post,
    web::{Bytes, Data, Path},
};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use tracing_actix_web::RootSpan;

use crate::chain::{ChainError, ChainRequest, Operation, ProcessingChain};
use crate::routes::{bearer_token, render};

async fn process(
    chain: &ProcessingChain,
    request: ChainRequest,
) -> Result<HttpResponse, ChainError> {
    Ok(render(chain.process(request).await?))
}

async fn process_for(
    operation: Operation,
    chain: Data<ProcessingChain>,
    credentials: Option<BearerAuth>,
    game_server_id: Path<String>,
    root_span: RootSpan,
) -> Result<HttpResponse, ChainError> {
    let game_server_id = game_server_id.into_inner();
    root_span.record("game_server_id", game_server_id.as_str());
    let request =
        ChainRequest::new(operation, bearer_token(credentials)).with_identity(game_server_id);

    process(&chain, request).await
}

#[get("/gameservers")]
pub async fn read_all_game_servers(
    chain: Data<ProcessingChain>,
    credentials: Option<BearerAuth>,
) -> Result<HttpResponse, ChainError> {
    let request = ChainRequest::new(Operation::ListInstances, bearer_token(credentials));

    process(&chain, request).await
}

#[get("/gameservers/{game_server_id}")]
pub async fn read_game_server(
    chain: Data<ProcessingChain>,
    credentials: Option<BearerAuth>,
    game_server_id: Path<String>,
    root_span: RootSpan,
) -> Result<HttpResponse, ChainError> {
    process_for(
        Operation::GetInstance,
        chain,
        credentials,
        game_server_id,
        root_span,
    )
    .await
}

#[post("/gameservers")]
pub async fn deploy_game_server(
    chain: Data<ProcessingChain>,
    credentials: Option<BearerAuth>,
    body: Bytes,
) -> Result<HttpResponse, ChainError> {
    let request = ChainRequest::new(Operation::DeployInstance, bearer_token(credentials))
        .with_body(body.to_vec());

    process(&chain, request).await
}

#[post("/gameservers/{game_server_id}/configure")]
pub async fn configure_game_server(
    chain: Data<ProcessingChain>,
    credentials: Option<BearerAuth>,
    game_server_id: Path<String>,
    body: Bytes,
    root_span: RootSpan,
) -> Result<HttpResponse, ChainError> {
    let game_server_id = game_server_id.into_inner();
    root_span.record("game_server_id", game_server_id.as_str());
    let request = ChainRequest::new(Operation::ConfigureInstance, bearer_token(credentials))
        .with_identity(game_server_id)
        .with_body(body.to_vec());

    process(&chain, request).await
}

#[post("/gameservers/{game_server_id}/start")]
pub async fn start_game_server(
    chain: Data<ProcessingChain>,
    credentials: Option<BearerAuth>,
    game_server_id: Path<String>,
    root_span: RootSpan,
) -> Result<HttpResponse, ChainError> {
    process_for(
        Operation::StartInstance,
        chain,
        credentials,
        game_server_id,
        root_span,
    )
    .await
}

#[post("/gameservers/{game_server_id}/stop")]
pub async fn stop_game_server(
    chain: Data<ProcessingChain>,
    credentials: Option<BearerAuth>,
    game_server_id: Path<String>,
    root_span: RootSpan,
) -> Result<HttpResponse, ChainError> {
    process_for(
        Operation::StopInstance,
        chain,
        credentials,
        game_server_id,
        root_span,
    )
    .await
}

#[post("/gameservers/{game_server_id}/restart")]
pub async fn restart_game_server(
    chain: Data<ProcessingChain>,
    credentials: Option<BearerAuth>,
    game_server_id: Path<String>,
    root_span: RootSpan,
) -> Result<HttpResponse, ChainError> {
    process_for(
        Operation::RestartInstance,
        chain,
        credentials,
        game_server_id,
        root_span,
    )
    .await
}

#[delete("/gameservers/{game_server_id}")]
pub async fn delete_game_server(
    chain: Data<ProcessingChain>,
    credentials: Option<BearerAuth>,
    game_server_id: Path<String>,
    root_span: RootSpan,
) -> Result<HttpResponse, ChainError> {
    process_for(
        Operation::DeleteInstance,
        chain,
        credentials,
        game_server_id,
        root_span,
    )
    .await
}
