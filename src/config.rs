//! Configuration for the board client and the task server.
//!
//! Values are layered: `.scrumboard/scrumboard.toml` (defaults when the
//! file is absent), then environment variables, then CLI flags applied by
//! the caller.
//!
//! # Configuration File Format
//!
//! ```toml
//! [client]
//! api_url = "http://127.0.0.1:3141"
//! timeout_secs = 10
//!
//! [server]
//! port = 3141
//! db_path = ".scrumboard/board.db"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::backend::server::ServerConfig;

pub const CONFIG_DIR: &str = ".scrumboard";
pub const CONFIG_FILE: &str = "scrumboard.toml";

pub const ENV_API_URL: &str = "SCRUMBOARD_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "SCRUMBOARD_TIMEOUT_SECS";
pub const ENV_PORT: &str = "SCRUMBOARD_PORT";
pub const ENV_DB_PATH: &str = "SCRUMBOARD_DB_PATH";

/// Settings used by the board commands to reach the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSection {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "http://127.0.0.1:3141".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_port() -> u16 {
    3141
}

fn default_db_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("board.db")
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            db_path: default_db_path(),
        }
    }
}

/// Parsed `scrumboard.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrumboardToml {
    #[serde(default)]
    pub client: ClientSection,
    #[serde(default)]
    pub server: ServerSection,
}

impl ScrumboardToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse scrumboard.toml")
    }

    /// Load from `<config_dir>/scrumboard.toml`, or defaults if the file
    /// doesn't exist.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize scrumboard.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply environment overrides read through `lookup`. Unparseable
    /// values are skipped and reported as warnings.
    pub fn apply_env<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();

        if let Some(url) = lookup(ENV_API_URL) {
            self.client.api_url = url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.trim().parse() {
                Ok(secs) => self.client.timeout_secs = secs,
                Err(_) => warnings.push(format!("Ignoring {}='{}': not a number", ENV_TIMEOUT_SECS, raw)),
            }
        }
        if let Some(raw) = lookup(ENV_PORT) {
            match raw.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warnings.push(format!("Ignoring {}='{}': not a port", ENV_PORT, raw)),
            }
        }
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.server.db_path = PathBuf::from(path);
        }

        warnings
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let url = self.client.api_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            warnings.push(format!(
                "Invalid api_url '{}': should start with http:// or https://",
                self.client.api_url
            ));
        }
        if self.client.timeout_secs == 0 {
            warnings.push("timeout_secs is 0: every request would time out immediately".into());
        }
        if self.server.port == 0 {
            warnings.push("port is 0: the server will bind a random port".into());
        }
        if self.server.db_path.as_os_str().is_empty() {
            warnings.push("db_path is empty".into());
        }

        warnings
    }
}

/// Resolved runtime configuration for one project directory.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: PathBuf,
    pub config_dir: PathBuf,
    pub toml: ScrumboardToml,
    /// Problems found while applying environment overrides.
    pub env_warnings: Vec<String>,
}

impl Config {
    /// Load `scrumboard.toml` under `project_dir` and apply the process
    /// environment on top.
    pub fn load(project_dir: &Path) -> Result<Self> {
        Self::load_with_env(project_dir, |key| std::env::var(key).ok())
    }

    pub fn load_with_env<F>(project_dir: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_dir = project_dir.join(CONFIG_DIR);
        let mut toml = ScrumboardToml::load_or_default(&config_dir)?;
        let env_warnings = toml.apply_env(lookup);
        for warning in &env_warnings {
            tracing::warn!("{}", warning);
        }
        Ok(Self {
            project_dir: project_dir.to_path_buf(),
            config_dir,
            toml,
            env_warnings,
        })
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    pub fn api_url(&self) -> &str {
        &self.toml.client.api_url
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.toml.client.timeout_secs)
    }

    /// Server settings with a relative `db_path` resolved against the
    /// project directory.
    pub fn server_config(&self) -> ServerConfig {
        let db_path = if self.toml.server.db_path.is_absolute() {
            self.toml.server.db_path.clone()
        } else {
            self.project_dir.join(&self.toml.server.db_path)
        };
        ServerConfig {
            port: self.toml.server.port,
            db_path,
        }
    }

    /// Environment warnings followed by file validation warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = self.env_warnings.clone();
        warnings.extend(self.toml.validate());
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = tempdir().unwrap();
        let config = Config::load_with_env(dir.path(), env(&[])).unwrap();
        assert_eq!(config.api_url(), "http://127.0.0.1:3141");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.server_config().port, 3141);
        assert_eq!(
            config.server_config().db_path,
            dir.path().join(".scrumboard/board.db")
        );
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_parse_partial_file_fills_defaults() {
        let toml = ScrumboardToml::parse("[server]\nport = 8080\n").unwrap();
        assert_eq!(toml.server.port, 8080);
        assert_eq!(toml.server.db_path, PathBuf::from(".scrumboard/board.db"));
        assert_eq!(toml.client, ClientSection::default());
    }

    #[test]
    fn test_parse_invalid_toml_is_error() {
        let err = ScrumboardToml::parse("[client\napi_url = 1").unwrap_err();
        assert!(err.to_string().contains("Failed to parse scrumboard.toml"));
    }

    #[test]
    fn test_load_reads_file_from_config_dir() {
        let dir = tempdir().unwrap();
        let config_dir = dir.path().join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join(CONFIG_FILE),
            "[client]\napi_url = \"http://board.local:9000\"\ntimeout_secs = 3\n",
        )
        .unwrap();

        let config = Config::load_with_env(dir.path(), env(&[])).unwrap();
        assert_eq!(config.api_url(), "http://board.local:9000");
        assert_eq!(config.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempdir().unwrap();
        let config = Config::load_with_env(
            dir.path(),
            env(&[
                (ENV_API_URL, "http://10.0.0.2:4000"),
                (ENV_TIMEOUT_SECS, "30"),
                (ENV_PORT, "4000"),
                (ENV_DB_PATH, "/var/lib/board.db"),
            ]),
        )
        .unwrap();
        assert_eq!(config.api_url(), "http://10.0.0.2:4000");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        let server = config.server_config();
        assert_eq!(server.port, 4000);
        assert_eq!(server.db_path, PathBuf::from("/var/lib/board.db"));
    }

    #[test]
    fn test_unparseable_env_values_become_warnings() {
        let dir = tempdir().unwrap();
        let config = Config::load_with_env(
            dir.path(),
            env(&[(ENV_TIMEOUT_SECS, "soon"), (ENV_PORT, "99999")]),
        )
        .unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.server_config().port, 3141);
        let warnings = config.validate();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains(ENV_TIMEOUT_SECS));
    }

    #[test]
    fn test_validate_flags_bad_values() {
        let toml = ScrumboardToml {
            client: ClientSection {
                api_url: "localhost:3141".into(),
                timeout_secs: 0,
            },
            server: ServerSection::default(),
        };
        let warnings = toml.validate();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("api_url"));
        assert!(warnings[1].contains("timeout_secs"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut toml = ScrumboardToml::default();
        toml.server.port = 5050;
        toml.save(&path).unwrap();
        assert_eq!(ScrumboardToml::load(&path).unwrap(), toml);
    }
}
