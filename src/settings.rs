use anyhow::{bail, Context};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Memory,
    Database,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub storage: StorageKind,
    pub database_url: Option<String>,
    pub pool_size: u32,
}

impl Settings {
    /// Defaults, then `filmorate.toml` if present, then `FILMORATE_*` variables.
    pub fn load() -> anyhow::Result<Self> {
        let builder = Config::builder()
            .add_source(File::with_name("filmorate").required(false))
            .add_source(Environment::with_prefix("FILMORATE").try_parsing(true));
        let mut settings = Self::from_builder(builder)?;
        if settings.database_url.is_none() {
            settings.database_url = std::env::var("DATABASE_URL").ok();
        }
        settings.check()?;
        Ok(settings)
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> anyhow::Result<Self> {
        builder
            .set_default("host", "127.0.0.1")?
            .set_default("port", 8080)?
            .set_default("storage", "memory")?
            .set_default("pool_size", 10)?
            .build()?
            .try_deserialize()
            .context("Invalid configuration")
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.storage == StorageKind::Database && self.database_url.is_none() {
            bail!("storage = \"database\" requires database_url or DATABASE_URL to be set");
        }
        if self.pool_size == 0 {
            bail!("pool_size must be positive");
        }
        Ok(())
    }
}
