//! # Server Configuration
//!
//! Everything in [`strongbox_store::config`] plus:
//!
//! - `STRONGBOX_ADMIN_TOKEN` - Bearer token for the administrative routes (required)
//! - `STRONGBOX_BIND_ADDR` - Listen address (default: `127.0.0.1:8088`)
//! - `STRONGBOX_MAX_BODY_SIZE` - Maximum upload size in bytes (default: 268435456 / 256MB)

use std::net::SocketAddr;

use strongbox_core::SecretString;
use strongbox_store::config::{get_env_parsed, get_env_string};
use strongbox_store::{ConfigError, EngineConfig, EngineConfigBuilder};

pub const ADMIN_TOKEN_VAR: &str = "STRONGBOX_ADMIN_TOKEN";
pub const BIND_ADDR_VAR: &str = "STRONGBOX_BIND_ADDR";
pub const MAX_BODY_SIZE_VAR: &str = "STRONGBOX_MAX_BODY_SIZE";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8088";
pub const DEFAULT_MAX_BODY_SIZE: usize = 256 * 1024 * 1024;

/// Tokens shorter than this are refused.
pub const MIN_ADMIN_TOKEN_LEN: usize = 16;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub engine: EngineConfig,
    pub admin_token: SecretString,
    pub bind_addr: SocketAddr,
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ServerConfigBuilder {
    engine: EngineConfigBuilder,
    admin_token: Option<SecretString>,
    bind_addr: Option<SocketAddr>,
    max_body_size: Option<usize>,
}

impl ServerConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if any variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self {
            engine: EngineConfigBuilder::from_env()?,
            ..Self::default()
        };

        if let Some(token) = get_env_string(ADMIN_TOKEN_VAR) {
            builder = builder.admin_token(SecretString::new(token));
        }
        if let Some(addr) = get_env_parsed::<SocketAddr>(BIND_ADDR_VAR)? {
            builder = builder.bind_addr(addr);
        }
        if let Some(size) = get_env_parsed::<usize>(MAX_BODY_SIZE_VAR)? {
            builder = builder.max_body_size(size);
        }

        Ok(builder)
    }

    #[must_use]
    pub fn engine(mut self, engine: EngineConfigBuilder) -> Self {
        self.engine = engine;
        self
    }

    #[must_use]
    pub fn admin_token(mut self, token: SecretString) -> Self {
        self.admin_token = Some(token);
        self
    }

    #[must_use]
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = Some(addr);
        self
    }

    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = Some(size);
        self
    }

    /// Validate configuration and build [`ServerConfig`]
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required value is missing or invalid.
    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        let engine = self.engine.build()?;

        let admin_token = self
            .admin_token
            .ok_or_else(|| ConfigError::MissingEnvVar(ADMIN_TOKEN_VAR.to_string()))?;
        if admin_token.expose_as_str().len() < MIN_ADMIN_TOKEN_LEN {
            return Err(ConfigError::ValidationError(format!(
                "admin token must be at least {} characters",
                MIN_ADMIN_TOKEN_LEN
            )));
        }

        let max_body_size = self.max_body_size.unwrap_or(DEFAULT_MAX_BODY_SIZE);
        if max_body_size == 0 {
            return Err(ConfigError::ValidationError(
                "max_body_size must be greater than 0".to_string(),
            ));
        }

        let bind_addr = match self.bind_addr {
            Some(addr) => addr,
            None => DEFAULT_BIND_ADDR.parse().map_err(|e| {
                ConfigError::ValidationError(format!("default bind address: {}", e))
            })?,
        };

        Ok(ServerConfig {
            engine,
            admin_token,
            bind_addr,
            max_body_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
            .database_path("app.db")
            .backup_secret(SecretString::new("secret".to_string()))
    }

    fn token() -> SecretString {
        SecretString::new("0123456789abcdef-admin".to_string())
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfigBuilder::new()
            .engine(engine())
            .admin_token(token())
            .build()
            .unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8088");
        assert_eq!(config.max_body_size, 256 * 1024 * 1024);
    }

    #[test]
    fn test_admin_token_required() {
        let result = ServerConfigBuilder::new().engine(engine()).build();
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(key)) if key == ADMIN_TOKEN_VAR));
    }

    #[test]
    fn test_short_admin_token_rejected() {
        let result = ServerConfigBuilder::new()
            .engine(engine())
            .admin_token(SecretString::new("short".to_string()))
            .build();
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_zero_body_size_rejected() {
        let result = ServerConfigBuilder::new()
            .engine(engine())
            .admin_token(token())
            .max_body_size(0)
            .build();
        assert!(result.is_err());
    }
}
