use actix_web::{
    HttpResponse, Responder, ResponseError,
    http::StatusCode,
    post,
    web::{Bytes, Data, Json},
};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use gamebase_config::SerializableSecretString;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::authentication::{AuthenticationError, JwtAuthority, TokenVerifier};
use crate::fleet::{FleetError, ProfileUpdate, Registration, Tenant, TenantStore};
use crate::routes::error_response;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("The email or password is incorrect")]
    InvalidCredentials,

    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthenticationError),

    #[error(transparent)]
    Fleet(#[from] FleetError),
}

impl UserError {
    fn classification(&self) -> &'static str {
        match self {
            UserError::Validation(_) | UserError::Fleet(FleetError::TenantExists(_)) => {
                "validation_error"
            }
            UserError::InvalidCredentials | UserError::Unauthorized(_) => "unauthorized",
            UserError::Fleet(FleetError::TenantNotFound(_)) => "not_found",
            UserError::Fleet(FleetError::IncompleteTenant { .. }) => "consistency_error",
            UserError::Fleet(_) => "cluster_error",
        }
    }
}

impl ResponseError for UserError {
    fn status_code(&self) -> StatusCode {
        match self.classification() {
            "validation_error" => StatusCode::BAD_REQUEST,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "not_found" => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self.status_code(), self.classification(), self.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub password: SerializableSecretString,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: SerializableSecretString,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub password: Option<SerializableSecretString>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub email: String,
    pub name: String,
}

fn validate_email(email: &str) -> Result<(), UserError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(UserError::Validation(format!("{email} is not a valid email"))),
    }
}

/// Binds a JSON body, a malformed one is a validation error.
fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, UserError> {
    serde_json::from_slice(body).map_err(|err| UserError::Validation(err.to_string()))
}

fn token_response(authority: &JwtAuthority, tenant: Tenant) -> Result<TokenResponse, UserError> {
    let token = authority.issue(&tenant)?;

    Ok(TokenResponse {
        token,
        email: tenant.email,
        name: tenant.name,
    })
}

#[post("/users/register")]
pub async fn register(
    tenants: Data<TenantStore>,
    authority: Data<JwtAuthority>,
    body: Bytes,
) -> Result<impl Responder, UserError> {
    let request: RegisterRequest = decode(&body)?;
    validate_email(&request.email)?;
    if request.password.expose_secret().is_empty() {
        return Err(UserError::Validation("the password must not be empty".to_owned()));
    }

    let registration = Registration {
        email: request.email,
        name: request.name,
        password: request.password.expose_secret().to_owned(),
    };
    let tenant = tenants.register(&registration).await?;

    Ok(Json(token_response(&authority, tenant)?))
}

#[post("/users/login")]
pub async fn login(
    tenants: Data<TenantStore>,
    authority: Data<JwtAuthority>,
    body: Bytes,
) -> Result<impl Responder, UserError> {
    let request: LoginRequest = decode(&body)?;
    if !tenants
        .verify_credential(&request.email, request.password.expose_secret())
        .await?
    {
        return Err(UserError::InvalidCredentials);
    }

    let tenant = tenants.tenant(&request.email).await?;
    info!(email = %tenant.email, "tenant logged in");

    Ok(Json(token_response(&authority, tenant)?))
}

/// Updates the caller's profile and returns a token for the possibly changed email.
#[post("/users/profile")]
pub async fn update_profile(
    tenants: Data<TenantStore>,
    authority: Data<JwtAuthority>,
    credentials: Option<BearerAuth>,
    body: Bytes,
) -> Result<impl Responder, UserError> {
    let credentials = credentials.ok_or(AuthenticationError::MissingToken)?;
    let claims = authority.verify(credentials.token())?;

    let request: UpdateProfileRequest = decode(&body)?;
    if let Some(email) = request.email.as_deref().filter(|email| !email.is_empty()) {
        validate_email(email)?;
    }
    let update = ProfileUpdate {
        email: request.email,
        name: request.name,
        password: request
            .password
            .map(|password| password.expose_secret().to_owned()),
    };
    let tenant = tenants.update_profile(&claims.sub, &update).await?;

    Ok(Json(token_response(&authority, tenant)?))
}
