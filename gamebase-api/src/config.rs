use gamebase_config::shared::{ClusterConfig, SentryConfig};
use gamebase_config::{Config, SerializableSecretString};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Complete configuration for the gamebase API service.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Application server settings.
    pub application: ApplicationSettings,
    /// Location of the template catalog.
    pub templates: TemplatesConfig,
    /// Cluster addressing and call deadlines.
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// Token signing settings.
    pub authentication: AuthenticationConfig,
    /// Optional Sentry configuration for error tracking.
    pub sentry: Option<SentryConfig>,
}

impl Config for ApiConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &[];
}

/// HTTP server configuration settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSettings {
    /// Host address the API listens on.
    pub host: String,
    /// Port number the API listens on.
    pub port: u16,
}

impl fmt::Display for ApplicationSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "    host: {}", self.host)?;
        writeln!(f, "    port: {}", self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplatesConfig {
    /// Root directory holding one subdirectory per template.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticationConfig {
    /// HMAC secret used to sign access tokens, base64 encoded or raw.
    pub jwt_secret: SerializableSecretString,
    /// Lifetime of issued access tokens.
    #[serde(default = "default_access_token_ttl_secs")]
    pub access_token_ttl_secs: u64,
}

impl AuthenticationConfig {
    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_ttl_secs)
    }
}

fn default_access_token_ttl_secs() -> u64 {
    24 * 60 * 60
}
