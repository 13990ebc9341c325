//! Runtime settings, read from flags or the environment.

use anyhow::Context;
use clap::Args;

use crate::db::PgStore;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5730";

#[derive(Debug, Clone, Args)]
pub struct DatabaseConfig {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "CRT_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub async fn connect(&self) -> anyhow::Result<PgStore> {
        let url = self
            .database_url
            .as_deref()
            .context("DATABASE_URL must be set to a Postgres instance")?;
        PgStore::connect(url, self.max_connections).await
    }
}

#[derive(Debug, Clone, Args)]
pub struct ServeConfig {
    #[arg(long, env = "CRT_BIND_ADDR", default_value = DEFAULT_BIND_ADDR)]
    pub bind: String,

    /// Keep all data in process memory instead of Postgres
    #[arg(long)]
    pub in_memory: bool,
}

impl ServeConfig {
    pub fn storage(&self) -> &'static str {
        if self.in_memory {
            "memory"
        } else {
            "postgres"
        }
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND_ADDR.to_string(),
            in_memory: true,
        }
    }
}
