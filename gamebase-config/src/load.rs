use serde::de::DeserializeOwned;
use std::path::Path;

use crate::environment::Environment;

/// Directory holding configuration files, relative to the working directory.
const CONFIGURATION_DIR: &str = "configuration";

/// File loaded for every environment before the environment specific one.
const BASE_CONFIG_FILE: &str = "base.yaml";

/// Prefix of environment variable overrides.
const ENV_PREFIX: &str = "APP";

const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator for nested keys, `APP_CLUSTER__NAMESPACE_PREFIX` sets `cluster.namespace_prefix`.
const ENV_SEPARATOR: &str = "__";

const LIST_SEPARATOR: &str = ",";

/// Describes how a configuration type is read from the environment.
pub trait Config {
    /// Keys whose environment variable values are split on `,` into lists.
    const LIST_PARSE_KEYS: &'static [&'static str];
}

/// Loads configuration from `configuration/` in the current working directory.
///
/// Sources are layered in this order, later ones overriding earlier ones:
/// 1. `configuration/base.yaml`
/// 2. `configuration/{environment}.yaml`
/// 3. environment variables prefixed with `APP_`
pub fn load_config<T>() -> Result<T, config::ConfigError>
where
    T: Config + DeserializeOwned,
{
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("failed to read current dir: {e}")))?;

    load_config_from(&base_path.join(CONFIGURATION_DIR))
}

/// Same as [`load_config`] but reads the YAML files from `configuration_directory`.
pub fn load_config_from<T>(configuration_directory: &Path) -> Result<T, config::ConfigError>
where
    T: Config + DeserializeOwned,
{
    let environment = Environment::load()
        .map_err(|e| config::ConfigError::Message(format!("invalid APP_ENVIRONMENT: {e}")))?;
    let environment_filename = format!("{environment}.yaml");

    let mut environment_source = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR);

    if !<T as Config>::LIST_PARSE_KEYS.is_empty() {
        environment_source = environment_source
            .try_parsing(true)
            .list_separator(LIST_SEPARATOR);

        for key in <T as Config>::LIST_PARSE_KEYS {
            environment_source = environment_source.with_list_parse_key(key);
        }
    }

    let settings = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join(BASE_CONFIG_FILE),
        ))
        .add_source(
            config::File::from(configuration_directory.join(environment_filename))
                .required(false),
        )
        .add_source(environment_source)
        .build()?;

    settings.try_deserialize::<T>()
}
