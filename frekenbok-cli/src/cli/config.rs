use anyhow::Context;
use frekenbok_ledger::DEFAULT_BASE_CURRENCY;
use frekenbok_tracing::TracingConfig;
use serde::{Deserialize, Serialize};

use std::path::Path;

use super::db::*;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerSection {
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    #[serde(default = "default_exec_migrations")]
    pub exec_migrations: bool,
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            base_currency: default_base_currency(),
            exec_migrations: default_exec_migrations(),
        }
    }
}

fn default_base_currency() -> String {
    DEFAULT_BASE_CURRENCY.to_string()
}

fn default_exec_migrations() -> bool {
    true
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub ledger: LedgerSection,
    #[serde(default)]
    pub tracing: TracingConfig,
}

pub struct EnvOverride {
    pub db_url: Option<String>,
}

impl Config {
    pub fn load_config(
        path: Option<impl AsRef<Path>>,
        env_override: EnvOverride,
    ) -> anyhow::Result<Self> {
        let mut config = if let Some(config_path) = path {
            let config_file =
                std::fs::read_to_string(config_path).context("Couldn't read config file")?;
            Self::from_yaml(&config_file)?
        } else {
            Config::default()
        };

        config.apply_env_override(env_override);
        Ok(config)
    }

    fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(raw).context("Couldn't parse config file")
    }

    fn apply_env_override(&mut self, EnvOverride { db_url }: EnvOverride) {
        if let Some(db_url) = db_url {
            self.db.db_url = db_url;
        }
    }
}
