use actix_web::{HttpResponse, get, web::Data};
use actix_web_httpauth::extractors::bearer::BearerAuth;

use crate::chain::{ChainError, ChainRequest, Operation, ProcessingChain};
use crate::routes::{bearer_token, render};

#[get("/templates")]
pub async fn list_templates(
    chain: Data<ProcessingChain>,
    credentials: Option<BearerAuth>,
) -> Result<HttpResponse, ChainError> {
    let request = ChainRequest::new(Operation::ListTemplates, bearer_token(credentials));

    Ok(render(chain.process(request).await?))
}
