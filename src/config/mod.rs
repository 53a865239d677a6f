mod basic;

pub use basic::BasicConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::LazyLock};

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Environment variables that override `basic.*` keys of the same (lowercased) name.
const ENV_OVERRIDES: [&str; 5] = [
    "DATABASE_URL",
    "LISTEN_ADDR",
    "LISTEN_PORT",
    "LOGLEVEL",
    "STATIC_DIR",
];

impl Config {
    /// Builds a Figment that merges defaults, an optional config TOML file and
    /// environment overrides, in that order of precedence.
    pub fn figment() -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        let figment = if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment.merge(Toml::file(DEFAULT_CONFIG_FILE))
        } else {
            figment
        };
        figment.merge(
            Env::raw()
                .only(&ENV_OVERRIDES)
                .map(|key| format!("basic.{}", key.as_str().to_ascii_lowercase()).into()),
        )
    }

    /// Loads configuration from defaults, `config.toml` (if present) and the environment.
    pub fn load() -> Self {
        Self::figment().extract().unwrap_or_else(|err| {
            panic!("failed to extract configuration (defaults + config.toml + env): {err}")
        })
    }
}

/// Global, lazily-initialized configuration instance.
pub static CONFIG: LazyLock<Config> = LazyLock::new(Config::load);
