//! Locating the database root.
//!
//! Tools embedding this crate can name the database in a TOML file:
//!
//! ```text
//! [database]
//! root = "/usr/share/trellis/database"
//! ```
//!
//! or through the `AION_TRELLIS_DB` environment variable, which takes
//! precedence.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{read_file, DatabaseError, DatabaseResult};

/// Environment variable naming the database root.
pub const DB_ENV_VAR: &str = "AION_TRELLIS_DB";

/// Top-level configuration file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// The `[database]` table.
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// The `[database]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database root directory, the one containing `devices.json`.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// Loads a configuration file.
pub fn load_config(path: &Path) -> DatabaseResult<Config> {
    let content = read_file(path)?;
    load_config_from_str(&content)
}

/// Parses configuration from a string.
pub fn load_config_from_str(content: &str) -> DatabaseResult<Config> {
    toml::from_str(content).map_err(|e| DatabaseError::Config(e.to_string()))
}

/// Resolves the database root.
///
/// Checks in order:
/// 1. The `AION_TRELLIS_DB` environment variable
/// 2. The provided `config_root`
///
/// Returns `None` if neither is set or the path doesn't exist.
pub fn resolve_db_root(config_root: Option<&Path>) -> Option<PathBuf> {
    if let Some(env_path) = std::env::var_os(DB_ENV_VAR) {
        let p = PathBuf::from(env_path);
        if p.exists() {
            return Some(p);
        }
        log::debug!("{DB_ENV_VAR} points to missing path {}", p.display());
    }

    config_root.filter(|p| p.exists()).map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_root() {
        let config = load_config_from_str(
            r#"
[database]
root = "/opt/trellis/database"
"#,
        )
        .unwrap();
        assert_eq!(
            config.database.root,
            Some(PathBuf::from("/opt/trellis/database"))
        );
    }

    #[test]
    fn empty_config_has_no_root() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn unknown_key_is_error() {
        let err = load_config_from_str("[database]\nrooot = \"/x\"\n").unwrap_err();
        assert!(matches!(err, DatabaseError::Config(_)));
    }

    #[test]
    fn invalid_toml_is_error() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, DatabaseError::Config(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trellis.toml");
        std::fs::write(&path, "[database]\nroot = \"db\"\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.database.root, Some(PathBuf::from("db")));
    }

    #[test]
    fn resolve_existing_config_root() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_db_root(Some(dir.path()));
        // The environment variable wins if it is set on this machine.
        if std::env::var_os(DB_ENV_VAR).is_none() {
            assert_eq!(resolved, Some(dir.path().to_path_buf()));
        }
    }

    #[test]
    fn resolve_nonexistent_config_root() {
        let result = resolve_db_root(Some(Path::new("/nonexistent/trellis/db")));
        if std::env::var_os(DB_ENV_VAR).is_none() {
            assert!(result.is_none());
        }
    }
}
