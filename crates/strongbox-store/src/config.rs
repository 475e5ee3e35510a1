//! # Environment-Based Configuration
//!
//! ## Environment Variables
//!
//! - `STRONGBOX_DATABASE_PATH` - SQLite database file (required)
//! - `STRONGBOX_BACKUP_SECRET` - Secret the artifact key is derived from (required)
//! - `STRONGBOX_BACKUP_DIR` - Directory for local backup copies (default: `./backups`)
//! - `STRONGBOX_POOL_SIZE` - Connection pool size, 1 to 100 (default: 4)

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use strongbox_core::SecretString;

pub const DATABASE_PATH_VAR: &str = "STRONGBOX_DATABASE_PATH";
pub const BACKUP_SECRET_VAR: &str = "STRONGBOX_BACKUP_SECRET";
pub const BACKUP_DIR_VAR: &str = "STRONGBOX_BACKUP_DIR";
pub const POOL_SIZE_VAR: &str = "STRONGBOX_POOL_SIZE";

pub const DEFAULT_BACKUP_DIR: &str = "./backups";
pub const DEFAULT_POOL_SIZE: usize = 4;
pub const MAX_POOL_SIZE: usize = 100;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable '{0}'")]
    MissingEnvVar(String),

    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Settings the backup engine needs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub database_path: PathBuf,
    pub backup_secret: SecretString,
    pub backup_dir: PathBuf,
    pub pool_size: usize,
}

/// Builder for [`EngineConfig`] with environment variable support
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    database_path: Option<PathBuf>,
    backup_secret: Option<SecretString>,
    backup_dir: Option<PathBuf>,
    pool_size: Option<usize>,
}

impl EngineConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load whatever is set in the environment. Required values that are
    /// missing are reported by [`build`](Self::build).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a variable is set to a value
    /// that cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::default();

        if let Some(path) = get_env_string(DATABASE_PATH_VAR) {
            builder = builder.database_path(path);
        }
        if let Some(secret) = get_env_string(BACKUP_SECRET_VAR) {
            builder = builder.backup_secret(SecretString::new(secret));
        }
        if let Some(dir) = get_env_string(BACKUP_DIR_VAR) {
            builder = builder.backup_dir(dir);
        }
        if let Some(size) = get_env_parsed::<usize>(POOL_SIZE_VAR)? {
            builder = builder.pool_size(size);
        }

        Ok(builder)
    }

    #[must_use]
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn backup_secret(mut self, secret: SecretString) -> Self {
        self.backup_secret = Some(secret);
        self
    }

    #[must_use]
    pub fn backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = Some(size);
        self
    }

    /// Validate configuration and build [`EngineConfig`]
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` for an absent required value and
    /// `ConfigError::ValidationError` for an out-of-range one.
    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        let database_path = self
            .database_path
            .ok_or_else(|| ConfigError::MissingEnvVar(DATABASE_PATH_VAR.to_string()))?;
        let backup_secret = self
            .backup_secret
            .ok_or_else(|| ConfigError::MissingEnvVar(BACKUP_SECRET_VAR.to_string()))?;

        if backup_secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "backup secret cannot be empty".to_string(),
            ));
        }

        let pool_size = self.pool_size.unwrap_or(DEFAULT_POOL_SIZE);
        if !(1..=MAX_POOL_SIZE).contains(&pool_size) {
            return Err(ConfigError::ValidationError(format!(
                "pool_size must be between 1 and {}",
                MAX_POOL_SIZE
            )));
        }

        Ok(EngineConfig {
            database_path,
            backup_secret,
            backup_dir: self
                .backup_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR)),
            pool_size,
        })
    }
}

// Environment variable helper functions

pub fn get_env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

pub fn get_env_parsed<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_string(key) {
        Some(val) => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid value '{val}': {e}"),
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
            .database_path("/var/lib/app/app.db")
            .backup_secret(SecretString::new("s3cret".to_string()))
    }

    #[test]
    fn test_defaults() {
        let config = complete().build().unwrap();
        assert_eq!(config.backup_dir, PathBuf::from("./backups"));
        assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
    }

    #[test]
    fn test_missing_required_values() {
        let result = EngineConfigBuilder::new()
            .backup_secret(SecretString::new("s".to_string()))
            .build();
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(key)) if key == DATABASE_PATH_VAR));

        let result = EngineConfigBuilder::new().database_path("a.db").build();
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(key)) if key == BACKUP_SECRET_VAR));
    }

    #[test]
    fn test_pool_size_validation() {
        assert!(complete().pool_size(0).build().is_err());
        assert!(complete().pool_size(101).build().is_err());
        assert_eq!(complete().pool_size(100).build().unwrap().pool_size, 100);
    }

    #[test]
    fn test_empty_secret_rejected() {
        let result = complete()
            .backup_secret(SecretString::new(String::new()))
            .build();
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_env_parsing_of_unset_variable() {
        assert_eq!(
            get_env_parsed::<usize>("STRONGBOX_TEST_NONEXISTENT").unwrap(),
            None
        );
    }

    #[test]
    fn test_config_debug_redacts_secret() {
        let config = complete().build().unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("s3cret"));
    }
}
