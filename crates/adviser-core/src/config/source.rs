use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::config::AdviserConfig;
use crate::error::{AdviserError, Result};

/// Where a configuration value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Built-in default
    Default,
    /// Configuration file
    File(PathBuf),
    /// Environment variable
    Environment(String),
    /// Command line flag
    Command,
}

impl ConfigSource {
    pub fn as_str(&self) -> &str {
        match self {
            ConfigSource::Default => "default",
            ConfigSource::File(_) => "file",
            ConfigSource::Environment(var) => var,
            ConfigSource::Command => "command",
        }
    }
}

/// Loads configuration from files and `ADVISER_*` environment variables
#[derive(Debug)]
pub struct ConfigLoader {
    use_environment: bool,
}

impl ConfigLoader {
    pub fn new(use_environment: bool) -> Self {
        Self { use_environment }
    }

    /// Get an `ADVISER_*` environment variable
    pub fn get_env(&self, var: &str) -> Option<String> {
        if !self.use_environment {
            return None;
        }

        env::var(var).ok().filter(|s| !s.is_empty())
    }

    /// Load configuration from a TOML or JSON file, chosen by extension
    pub fn load_config_file<P: AsRef<Path>>(&self, path: P) -> Result<AdviserConfig> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path)
            .map_err(|e| AdviserError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let config = if is_json {
            AdviserConfig::from_json(&contents)
        } else {
            AdviserConfig::from_toml(&contents)
        };

        config.map_err(|e| AdviserError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Load the file (or defaults) and apply environment overrides.
    ///
    /// The result is not validated; callers apply command line overrides first.
    pub fn load(&self, path: Option<&Path>) -> Result<(AdviserConfig, Vec<ConfigSource>)> {
        let mut sources = Vec::new();
        let mut config = match path {
            Some(path) => {
                sources.push(ConfigSource::File(path.to_path_buf()));
                self.load_config_file(path)?
            }
            None => {
                sources.push(ConfigSource::Default);
                AdviserConfig::default()
            }
        };

        sources.extend(self.apply_environment(&mut config)?);
        Ok((config, sources))
    }

    /// Apply `ADVISER_SEED`, `ADVISER_LIMIT`, `ADVISER_COUNT`, `ADVISER_BEAM_WIDTH`
    /// and `ADVISER_TIME_LIMIT` overrides
    pub fn apply_environment(&self, config: &mut AdviserConfig) -> Result<Vec<ConfigSource>> {
        let mut applied = Vec::new();

        if let Some(seed) = self.parse_env::<u64>("ADVISER_SEED")? {
            config.seed = Some(seed);
            applied.push(ConfigSource::Environment("ADVISER_SEED".to_string()));
        }
        if let Some(limit) = self.parse_env::<usize>("ADVISER_LIMIT")? {
            config.limit = limit;
            applied.push(ConfigSource::Environment("ADVISER_LIMIT".to_string()));
        }
        if let Some(count) = self.parse_env::<usize>("ADVISER_COUNT")? {
            config.count = count;
            applied.push(ConfigSource::Environment("ADVISER_COUNT".to_string()));
        }
        if let Some(width) = self.parse_env::<usize>("ADVISER_BEAM_WIDTH")? {
            config.beam_width = width;
            applied.push(ConfigSource::Environment("ADVISER_BEAM_WIDTH".to_string()));
        }
        if let Some(secs) = self.parse_env::<u64>("ADVISER_TIME_LIMIT")? {
            config.time_limit_secs = Some(secs);
            applied.push(ConfigSource::Environment("ADVISER_TIME_LIMIT".to_string()));
        }

        for source in &applied {
            log::debug!("Configuration override from {}", source.as_str());
        }

        Ok(applied)
    }

    fn parse_env<T: std::str::FromStr>(&self, var: &str) -> Result<Option<T>> {
        match self.get_env(var) {
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| AdviserError::Config(format!("Invalid value for {}: {}", var, raw))),
            None => Ok(None),
        }
    }
}
