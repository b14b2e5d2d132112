mod settings;

use std::env;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{
    BrokerSettings, DEFAULT_MAX_FRAME_BYTES, PersistenceSettings, ServerSettings, Settings,
};

/// Environment variable that overrides the snapshot directory.
pub const DATA_DIR_ENV: &str = "MSG_DATA_DIR";

/// Older spelling of [`DATA_DIR_ENV`], honoured when the new one is unset.
pub const LEGACY_DATA_DIR_ENV: &str = "msg_DATA_DIR";

/// Prefix of environment overrides, e.g. `MSG_SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "MSG";

/// Loads the configuration from `config/default.*` and the environment.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from("config/default")
}

/// Loads the configuration from the file `path` (optional, extension may be
/// omitted) and environment variables, merged over the defaults.
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("persistence.data_dir", data_dir_from_env())?;

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    let default = Settings::default();

    Ok(Settings {
        server: ServerSettings {
            host: partial
                .server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: partial
                .server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
            max_frame_bytes: partial
                .server
                .as_ref()
                .and_then(|s| s.max_frame_bytes)
                .unwrap_or(default.server.max_frame_bytes),
        },
        broker: BrokerSettings {
            max_backlog: partial
                .broker
                .as_ref()
                .and_then(|b| b.max_backlog)
                .unwrap_or(default.broker.max_backlog),
            status_interval_secs: partial
                .broker
                .as_ref()
                .and_then(|b| b.status_interval_secs)
                .unwrap_or(default.broker.status_interval_secs),
        },
        persistence: PersistenceSettings {
            data_dir: partial
                .persistence
                .as_ref()
                .and_then(|p| p.data_dir.clone())
                .unwrap_or(default.persistence.data_dir),
        },
    })
}

fn data_dir_from_env() -> Option<String> {
    env::var(DATA_DIR_ENV)
        .or_else(|_| env::var(LEGACY_DATA_DIR_ENV))
        .ok()
}

#[cfg(test)]
mod tests;
