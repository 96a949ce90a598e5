use crate::core::db::{ConnectParams, SqliteDriver, UpdateSyntax};
use crate::core::{MultiDbError, Result};
use crate::registry::ConnectionRegistry;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub statements: StatementsConfig,
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
}

/// SQLite driver settings.
#[derive(Debug, Deserialize)]
pub struct DriverConfig {
    pub busy_timeout_ms: Option<u64>,
    #[serde(default = "default_create_if_missing")]
    pub create_if_missing: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            busy_timeout_ms: None,
            create_if_missing: default_create_if_missing(),
        }
    }
}

fn default_create_if_missing() -> bool {
    true
}

/// Statement builder settings.
#[derive(Debug, Default, Deserialize)]
pub struct StatementsConfig {
    #[serde(default)]
    pub update_syntax: UpdateSyntax,
}

/// One `[[connections]]` entry.
#[derive(Debug, Deserialize)]
pub struct ConnectionConfig {
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub server: String,
    pub database: String,
    #[serde(default)]
    pub primary: bool,
}

impl ConnectionConfig {
    pub fn params(&self) -> ConnectParams {
        ConnectParams::new(
            self.username.clone(),
            self.password.clone(),
            self.server.clone(),
            self.database.clone(),
        )
    }
}

impl Config {
    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// `<config dir>/multidb/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("multidb").join("config.toml"))
    }

    pub fn sqlite_driver(&self) -> SqliteDriver {
        let driver = SqliteDriver::new().with_create_if_missing(self.driver.create_if_missing);
        match self.driver.busy_timeout_ms {
            Some(ms) => driver.with_busy_timeout(Duration::from_millis(ms)),
            None => driver,
        }
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = multidb::config::load_config("config.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    Config::from_toml(&content)
}

impl ConnectionRegistry<SqliteDriver> {
    /// Registers every configured connection in file order.
    ///
    /// The entry marked `primary = true` is selected afterwards; without
    /// one, the last entry stays primary. Any connect failure aborts.
    pub fn from_config(config: &Config) -> Result<Self> {
        if config.connections.iter().filter(|c| c.primary).count() > 1 {
            return Err(MultiDbError::Config(
                "more than one connection is marked primary".to_string(),
            ));
        }

        let mut registry = ConnectionRegistry::new(config.sqlite_driver());
        registry.set_update_syntax(config.statements.update_syntax);

        let mut primary = None;
        for entry in &config.connections {
            let id = registry.add_connection(&entry.params(), entry.primary)?;
            if entry.primary {
                primary = Some(id);
            }
        }
        if let Some(id) = primary {
            registry.set_primary(id);
        }

        info!(connections = registry.len(), "registry loaded from configuration");
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CONFIG: &str = r#"
[driver]
busy_timeout_ms = 5000
create_if_missing = false

[statements]
update_syntax = "standard"

[[connections]]
username = "app"
password = "secret"
server = ":memory:"
database = "main"
primary = true

[[connections]]
username = "app"
server = ":memory:"
database = "replica"
"#;

    #[test]
    fn test_load_config_from_str() {
        let config = Config::from_toml(SAMPLE_CONFIG).expect("Failed to parse sample config");
        assert_eq!(config.driver.busy_timeout_ms, Some(5000));
        assert!(!config.driver.create_if_missing);
        assert_eq!(config.statements.update_syntax, UpdateSyntax::Standard);
        assert_eq!(config.connections.len(), 2);
        assert_eq!(config.connections[0].password, "secret");
        assert_eq!(config.connections[1].password, "");
        assert!(!config.connections[1].primary);
        assert_eq!(config.connections[1].params().connection_id(), ":memory:_app_replica");
    }

    #[test]
    fn test_defaults_for_empty_file() {
        let config = Config::from_toml("").unwrap();
        assert!(config.driver.create_if_missing);
        assert_eq!(config.driver.busy_timeout_ms, None);
        assert_eq!(config.statements.update_syntax, UpdateSyntax::Parenthesized);
        assert!(config.connections.is_empty());
    }

    #[test]
    fn test_registry_from_config_honors_primary_flag() {
        let config = Config::from_toml(SAMPLE_CONFIG).unwrap();
        let registry = ConnectionRegistry::from_config(&config).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.primary(), Some(":memory:_app_main"));
        assert_eq!(registry.update_syntax(), UpdateSyntax::Standard);
    }

    #[test]
    fn test_registry_from_config_without_primary_uses_last() {
        let config = Config::from_toml(&SAMPLE_CONFIG.replace("primary = true", "")).unwrap();
        let registry = ConnectionRegistry::from_config(&config).unwrap();
        assert_eq!(registry.primary(), Some(":memory:_app_replica"));
    }

    #[test]
    fn test_two_primaries_rejected() {
        let doubled = format!("{}primary = true\n", SAMPLE_CONFIG);
        let config = Config::from_toml(&doubled).unwrap();
        assert!(matches!(
            ConnectionRegistry::from_config(&config),
            Err(MultiDbError::Config(_))
        ));
    }

    #[test]
    fn test_missing_config_file() {
        assert!(matches!(
            load_config("/nonexistent/multidb.toml"),
            Err(MultiDbError::Io(_))
        ));
    }
}
