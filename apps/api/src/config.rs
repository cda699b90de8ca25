//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use motopos_db::DbConfig;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Interface to bind
    pub host: String,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// Upper bound for one storage call
    pub db_query_timeout: Duration,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// JWT lifetime in seconds
    pub jwt_lifetime_secs: i64,

    /// Username of the admin account created by `/init`
    pub admin_username: String,

    /// Password of the admin account created by `/init`
    pub admin_password: String,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Ok(ApiConfig {
            host: env::var("MOTOPOS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            port: parse_var("MOTOPOS_PORT", "8080")?,

            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "motopos.db".to_string()),

            db_max_connections: parse_var("DB_MAX_CONNECTIONS", "5")?,

            db_query_timeout: Duration::from_millis(parse_var("DB_QUERY_TIMEOUT_MS", "5000")?),

            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                // In production, this MUST be set via environment variable
                "motopos-dev-secret-change-in-production".to_string()
            }),

            jwt_lifetime_secs: parse_var("JWT_LIFETIME_SECS", "604800")?, // 7 days

            admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),

            admin_password: env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string()),
        })
    }

    /// Settings for tests: in-memory database, fixed secret.
    pub fn for_tests() -> Self {
        ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_path: ":memory:".to_string(),
            db_max_connections: 1,
            db_query_timeout: Duration::from_secs(5),
            jwt_secret: "test-secret".to_string(),
            jwt_lifetime_secs: 3600,
            admin_username: "admin".to_string(),
            admin_password: "admin123".to_string(),
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("MOTOPOS_HOST".to_string()))
    }

    pub fn db_config(&self) -> DbConfig {
        if self.database_path == ":memory:" {
            return DbConfig::in_memory().query_timeout(self.db_query_timeout);
        }
        DbConfig::new(&self.database_path)
            .max_connections(self.db_max_connections)
            .query_timeout(self.db_query_timeout)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: &str) -> Result<T, ConfigError> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string()))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_db_config() {
        let config = ApiConfig::for_tests();
        let db = config.db_config();
        assert_eq!(db.max_connections, 1);
        assert_eq!(db.query_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_socket_addr() {
        let mut config = ApiConfig::for_tests();
        config.port = 8080;
        assert_eq!(config.socket_addr().unwrap().port(), 8080);

        config.host = "not a host".to_string();
        assert!(config.socket_addr().is_err());
    }
}
