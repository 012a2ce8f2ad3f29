use std::path::PathBuf;

use anyhow::{Context, Result};
use ftquery::config::FtConfig;
use ftquery::query::TreeOptions;
use ftquery::reply::OutputMode;
use redis::aio::ConnectionManager;

use crate::output::OutputManager;

/// Everything a subcommand needs besides its own arguments.
pub struct CommandContext {
    pub config: FtConfig,
    pub dry_run: bool,
    pub pairs: bool,
}

impl CommandContext {
    pub fn load(config_path: Option<&PathBuf>, dry_run: bool, pairs: bool) -> Result<Self> {
        let config = match config_path {
            Some(path) => FtConfig::load(path).with_context(|| format!("Failed to load {}", path.display()))?,
            None => FtConfig::load_default().context("Failed to load ftquery.toml")?,
        };
        Ok(Self {
            config,
            dry_run,
            pairs,
        })
    }

    /// The index named on the command line, else the configured default.
    pub fn index(&self, explicit: Option<&str>) -> Result<String> {
        explicit
            .map(str::to_string)
            .or_else(|| self.config.search.index.clone())
            .context("No index given. Pass --index or set [search] index in ftquery.toml")
    }

    pub fn tree_options(&self) -> TreeOptions {
        self.config.matching.clone()
    }

    pub fn output_mode(&self) -> OutputMode {
        if self.pairs {
            OutputMode::Pairs
        } else {
            self.config.search.output
        }
    }

    pub async fn connect(&self, output: &OutputManager) -> Result<ConnectionManager> {
        let redis_url = self
            .config
            .redis_url()
            .context("REDIS_URL environment variable not set. Set it to connect to Redis.")?;

        output.progress("Connecting to Redis");
        let client = redis::Client::open(redis_url.as_str()).context("Failed to create Redis client")?;
        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;
        output.clear_line();
        Ok(conn)
    }
}
