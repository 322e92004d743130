use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::EngineOptions;
use crate::error::{Error, Result};

/// On-disk configuration, all fields optional. Lives at
/// `~/.config/guildsnap/config.toml` (or platform equivalent).
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    db_path: Option<PathBuf>,
    token: Option<String>,
    pin_quota: Option<u32>,
    list_cache_ttl_secs: Option<u64>,
    lookup_cache_size: Option<usize>,
    snapshot_cache_size: Option<usize>,
}

pub struct Config {
    pub db_path: Option<PathBuf>,
    pub token: Option<String>,
    pub engine: EngineOptions,
}

impl Config {
    /// Load the config file if present, then let `DISCORD_TOKEN` override the
    /// token. A missing file yields defaults; a malformed file is an error.
    pub fn load() -> Result<Self> {
        let file = match config_file_path() {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(&path)?;
                toml::from_str(&text)
                    .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?
            }
            _ => FileConfig::default(),
        };

        Ok(Self::from_file(file))
    }

    fn from_file(file: FileConfig) -> Self {
        let defaults = EngineOptions::default();
        let engine = EngineOptions {
            pin_quota: file.pin_quota.unwrap_or(defaults.pin_quota),
            list_cache_ttl: file
                .list_cache_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.list_cache_ttl),
            lookup_cache_size: file.lookup_cache_size.unwrap_or(defaults.lookup_cache_size),
            snapshot_cache_size: file
                .snapshot_cache_size
                .unwrap_or(defaults.snapshot_cache_size),
        };

        Config {
            db_path: file.db_path,
            token: std::env::var("DISCORD_TOKEN").ok().or(file.token),
            engine,
        }
    }

    /// The bot token, required only by commands that talk to Discord.
    pub fn require_token(&self) -> Result<&str> {
        self.token.as_deref().ok_or_else(|| {
            Error::Config("no token: set DISCORD_TOKEN or `token` in config.toml".to_string())
        })
    }
}

fn config_file_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "guildsnap")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_engine_defaults() {
        let config = Config::from_file(FileConfig::default());
        assert_eq!(config.engine.pin_quota, 6);
        assert_eq!(config.engine.list_cache_ttl, Duration::from_secs(600));
        assert_eq!(config.engine.lookup_cache_size, 1000);
        assert_eq!(config.engine.snapshot_cache_size, 200);
        assert!(config.db_path.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let file: FileConfig = toml::from_str(
            "db_path = \"/tmp/guildsnap-test.db\"\n\
             pin_quota = 3\n\
             list_cache_ttl_secs = 30\n",
        )
        .unwrap();
        let config = Config::from_file(file);
        assert_eq!(config.engine.pin_quota, 3);
        assert_eq!(config.engine.list_cache_ttl, Duration::from_secs(30));
        assert_eq!(
            config.db_path.as_deref(),
            Some(std::path::Path::new("/tmp/guildsnap-test.db"))
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed: std::result::Result<FileConfig, _> = toml::from_str("no_such_key = 1\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn missing_token_is_a_config_error() {
        let config = Config {
            db_path: None,
            token: None,
            engine: EngineOptions::default(),
        };
        assert!(matches!(config.require_token(), Err(Error::Config(_))));
    }
}
