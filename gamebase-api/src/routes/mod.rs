use actix_web::{
    HttpResponse, ResponseError,
    http::{StatusCode, header::ContentType},
};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use serde::{Deserialize, Serialize};

use crate::chain::{ChainError, ChainResponse};

pub mod game_servers;
pub mod health_check;
pub mod templates;
pub mod users;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Stable class of the failure, e.g. `not_found` or `partial_failure`.
    pub classification: String,
    pub error: String,
}

pub(crate) fn error_response(
    status: StatusCode,
    classification: &str,
    error: String,
) -> HttpResponse {
    let error_message = ErrorMessage {
        classification: classification.to_owned(),
        error,
    };
    let body = serde_json::to_string(&error_message).expect("failed to serialize error message");
    HttpResponse::build(status)
        .insert_header(ContentType::json())
        .body(body)
}

impl ResponseError for ChainError {
    fn status_code(&self) -> StatusCode {
        match self.classification() {
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "validation_error" => StatusCode::BAD_REQUEST,
            "not_found" => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self.status_code(), self.classification(), self.to_string())
    }
}

/// The raw bearer token, validation is left to the processing chain.
fn bearer_token(credentials: Option<BearerAuth>) -> Option<String> {
    credentials.map(|credentials| credentials.token().to_owned())
}

fn render(response: ChainResponse) -> HttpResponse {
    match response {
        ChainResponse::Done => HttpResponse::Ok().finish(),
        response => HttpResponse::Ok().json(response),
    }
}
