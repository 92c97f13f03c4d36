use async_trait::async_trait;
use std::sync::Arc;

use crate::authentication::{AuthenticationError, TokenVerifier};
use crate::chain::{ChainError, TenantContext};
use crate::fleet::{FleetError, TenantStore};

/// Maps a tenant's email to the namespace it owns.
#[async_trait]
pub trait TenantResolver: Send + Sync {
    async fn resolve_namespace(&self, email: &str) -> Result<String, FleetError>;
}

#[async_trait]
impl TenantResolver for TenantStore {
    async fn resolve_namespace(&self, email: &str) -> Result<String, FleetError> {
        TenantStore::resolve_namespace(self, email).await
    }
}

/// First stage: validates the bearer credential and resolves the tenant namespace.
pub struct Authenticator {
    verifier: Arc<dyn TokenVerifier>,
    tenants: Arc<dyn TenantResolver>,
}

impl Authenticator {
    pub fn new(verifier: Arc<dyn TokenVerifier>, tenants: Arc<dyn TenantResolver>) -> Self {
        Self { verifier, tenants }
    }

    pub async fn authenticate(
        &self,
        credential: Option<&str>,
    ) -> Result<TenantContext, ChainError> {
        let token = credential
            .filter(|token| !token.is_empty())
            .ok_or(AuthenticationError::MissingToken)?;
        let claims = self.verifier.verify(token)?;

        match self.tenants.resolve_namespace(&claims.sub).await {
            Ok(namespace) => Ok(TenantContext {
                email: claims.sub,
                namespace,
            }),
            Err(FleetError::TenantNotFound(email)) => {
                Err(AuthenticationError::UnknownTenant(email).into())
            }
            Err(err) => Err(err.into()),
        }
    }
}
