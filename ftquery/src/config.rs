//! `ftquery.toml` loading.
//!
//! ```toml
//! [redis]
//! url = "${REDIS_URL}"
//!
//! [search]
//! index = "books"
//! output = "object"
//!
//! [matching]
//! conjunction = "OR"
//! prefix_matching = true
//! fuzzy_distance = 1
//! ```
//!
//! `[redis] url`, `[search] index` and `[matching] stop_words` may reference environment
//! variables as `${NAME}`. Expansion happens on the parsed values, never on the file text.
//! The index and stop words are expanded at load, keeping references to unset variables
//! verbatim; the URL is resolved only when a connection needs it, so a dry run works
//! without `REDIS_URL`.

use std::path::Path;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{FtError, FtResult};
use crate::query::TreeOptions;
use crate::reply::OutputMode;

pub const DEFAULT_CONFIG_FILE: &str = "ftquery.toml";
const DEFAULT_REDIS_URL: &str = "${REDIS_URL}";

static ENV_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env reference pattern compiles"));

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FtConfig {
    #[serde(default)]
    pub redis: RedisSettings,
    #[serde(default)]
    pub search: SearchSettings,
    /// Defaults for every [`ConditionTree`](crate::query::ConditionTree) the CLI builds.
    #[serde(default)]
    pub matching: TreeOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisSettings {
    #[serde(default = "default_redis_url")]
    pub url: String,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

fn default_redis_url() -> String {
    DEFAULT_REDIS_URL.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Index used when a command does not name one.
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub output: OutputMode,
}

impl FtConfig {
    /// Parse configuration text without expanding environment references.
    pub fn from_toml(content: &str) -> FtResult<Self> {
        toml::from_str(content).map_err(|err| FtError::config(format!("Failed to parse configuration: {}", err)))
    }

    /// Read and parse the file at `path`, then expand environment references in its values.
    pub fn load(path: &Path) -> FtResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| FtError::config(format!("Failed to read {}: {}", path.display(), err)))?;
        let mut config = Self::from_toml(&content)?;
        config.expand_values();
        debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    fn expand_values(&mut self) {
        if let Some(index) = &mut self.search.index {
            *index = expand_set_env(index);
        }
        for word in &mut self.matching.matching.stop_words {
            *word = expand_set_env(word);
        }
    }

    /// Load `ftquery.toml` from `dir` when present, defaults otherwise.
    pub fn load_from_dir(dir: &Path) -> FtResult<Self> {
        let path = dir.join(DEFAULT_CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            debug!("no {} in {}, using defaults", DEFAULT_CONFIG_FILE, dir.display());
            Ok(Self::default())
        }
    }

    /// Load `ftquery.toml` from the current directory when present, defaults otherwise.
    pub fn load_default() -> FtResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|err| FtError::config(format!("Failed to get current directory: {}", err)))?;
        Self::load_from_dir(&cwd)
    }

    /// The Redis URL with environment references resolved.
    pub fn redis_url(&self) -> FtResult<String> {
        expand_env(&self.redis.url)
    }
}

/// Replace every `${NAME}` with the value of the environment variable `NAME`.
pub fn expand_env(input: &str) -> FtResult<String> {
    let expanded = expand_set_env(input);
    match ENV_REFERENCE.captures(&expanded).and_then(|captures| captures.get(1)) {
        Some(name) => Err(FtError::config(format!("Environment variable {} not set", name.as_str()))),
        None => Ok(expanded),
    }
}

/// Like [`expand_env`], but references to unset variables are left in place.
fn expand_set_env(input: &str) -> String {
    ENV_REFERENCE
        .replace_all(input, |captures: &regex::Captures<'_>| {
            std::env::var(&captures[1]).unwrap_or_else(|_| captures[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Conjunction;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn defaults_point_at_redis_url_variable() {
        let config = FtConfig::default();
        assert_eq!(config.redis.url, "${REDIS_URL}");
        assert_eq!(config.search.index, None);
        assert!(config.matching.all_on_empty);
    }

    #[test]
    fn matching_section_fills_tree_options() {
        let config = FtConfig::from_toml(
            r#"
            [matching]
            conjunction = "or"
            prefix_matching = true
            fuzzy_distance = 2
            stop_words = ["the"]
            "#,
        )
        .unwrap();
        assert_eq!(config.matching.conjunction, Conjunction::Or);
        assert!(config.matching.matching.prefix_matching);
        assert_eq!(config.matching.matching.fuzzy_distance, 2);
        assert_eq!(config.matching.matching.stop_words, ["the"]);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = FtConfig::from_toml("[search\nindex = 1").unwrap_err();
        assert!(matches!(err, FtError::Config { .. }));
    }

    #[test]
    #[serial]
    fn load_expands_environment_references() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[search]\nindex = \"${{FTQUERY_TEST_INDEX}}\"").unwrap();

        unsafe { std::env::set_var("FTQUERY_TEST_INDEX", "books") };
        let config = FtConfig::load_from_dir(dir.path()).unwrap();
        unsafe { std::env::remove_var("FTQUERY_TEST_INDEX") };

        assert_eq!(config.search.index.as_deref(), Some("books"));
    }

    #[test]
    #[serial]
    fn missing_variable_is_reported() {
        unsafe { std::env::remove_var("FTQUERY_TEST_MISSING") };
        let err = expand_env("redis://${FTQUERY_TEST_MISSING}/0").unwrap_err();
        assert!(matches!(err, FtError::Config { message } if message.contains("FTQUERY_TEST_MISSING")));
    }

    #[test]
    #[serial]
    fn unset_variables_survive_loading_until_used() {
        unsafe { std::env::remove_var("FTQUERY_TEST_URL") };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[redis]\nurl = \"${FTQUERY_TEST_URL}\"\n").unwrap();

        let config = FtConfig::load(&path).unwrap();
        assert_eq!(config.redis.url, "${FTQUERY_TEST_URL}");
        assert!(matches!(config.redis_url(), Err(FtError::Config { .. })));
    }

    #[test]
    #[serial]
    fn expanded_values_cannot_inject_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "[search]\nindex = \"${FTQUERY_TEST_HOSTILE}\"\n").unwrap();

        let hostile = "books\"\n[redis]\nurl = \"redis://elsewhere\"\n";
        unsafe { std::env::set_var("FTQUERY_TEST_HOSTILE", hostile) };
        let config = FtConfig::load(&path);
        unsafe { std::env::remove_var("FTQUERY_TEST_HOSTILE") };

        let config = config.unwrap();
        assert_eq!(config.search.index.as_deref(), Some(hostile));
        assert_eq!(config.redis.url, "${REDIS_URL}");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(FtConfig::load_from_dir(dir.path()).unwrap(), FtConfig::default());
    }
}
