use serde::{Deserialize, Serialize};

/// Sentry error reporting configuration.
///
/// When present, the API binary installs the Sentry panic integration before the
/// async runtime starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentryConfig {
    /// DSN events are reported to.
    pub dsn: String,
}
