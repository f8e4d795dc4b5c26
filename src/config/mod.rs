use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Postgres connection string. `None` runs on the flat-file backend only.
    pub database_url: Option<String>,
    pub data_dir: PathBuf,
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_rate_limiting: bool,
    pub auth_rate_limit_requests: u32,
    pub auth_rate_limit_window_secs: u64,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub password_memory_kib: u32,
    pub password_iterations: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Some(port) = env::var("WARDROBE_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }

        // Storage overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            let v = v.trim().to_string();
            self.storage.database_url = if v.is_empty() { None } else { Some(v) };
        }
        if let Ok(v) = env::var("WARDROBE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.storage.max_connections = v.parse().unwrap_or(self.storage.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.storage.connection_timeout_secs =
                v.parse().unwrap_or(self.storage.connection_timeout_secs);
        }

        // Session overrides
        if let Ok(v) = env::var("SESSION_SWEEP_INTERVAL_SECS") {
            self.session.sweep_interval_secs = v.parse().unwrap_or(self.session.sweep_interval_secs);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_RATE_LIMITING") {
            self.api.enable_rate_limiting = v.parse().unwrap_or(self.api.enable_rate_limiting);
        }
        if let Ok(v) = env::var("AUTH_RATE_LIMIT_REQUESTS") {
            self.api.auth_rate_limit_requests = v.parse().unwrap_or(self.api.auth_rate_limit_requests);
        }
        if let Ok(v) = env::var("AUTH_RATE_LIMIT_WINDOW_SECS") {
            self.api.auth_rate_limit_window_secs =
                v.parse().unwrap_or(self.api.auth_rate_limit_window_secs);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("ALLOWED_ORIGINS").or_else(|_| env::var("SECURITY_CORS_ORIGINS")) {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SECURITY_PASSWORD_MEMORY_KIB") {
            self.security.password_memory_kib = v.parse().unwrap_or(self.security.password_memory_kib);
        }
        if let Ok(v) = env::var("SECURITY_PASSWORD_ITERATIONS") {
            self.security.password_iterations = v.parse().unwrap_or(self.security.password_iterations);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            storage: StorageConfig {
                database_url: None,
                data_dir: PathBuf::from("data"),
                max_connections: 5,
                connection_timeout_secs: 10,
            },
            session: SessionConfig {
                sweep_interval_secs: 60 * 60,
            },
            api: ApiConfig {
                enable_rate_limiting: false,
                auth_rate_limit_requests: 5,
                auth_rate_limit_window_secs: 15 * 60,
                enable_request_logging: true,
                max_request_size_bytes: 15 * 1024 * 1024, // 15MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["*".to_string()],
                password_memory_kib: 19 * 1024,
                password_iterations: 2,
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            storage: StorageConfig {
                database_url: None,
                data_dir: PathBuf::from("data"),
                max_connections: 10,
                connection_timeout_secs: 10,
            },
            session: SessionConfig {
                sweep_interval_secs: 60 * 60,
            },
            api: ApiConfig {
                enable_rate_limiting: true,
                auth_rate_limit_requests: 5,
                auth_rate_limit_window_secs: 15 * 60,
                enable_request_logging: true,
                max_request_size_bytes: 15 * 1024 * 1024,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                password_memory_kib: 19 * 1024,
                password_iterations: 2,
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            storage: StorageConfig {
                database_url: None,
                data_dir: PathBuf::from("data"),
                max_connections: 20,
                connection_timeout_secs: 10,
            },
            session: SessionConfig {
                sweep_interval_secs: 60 * 60,
            },
            api: ApiConfig {
                enable_rate_limiting: true,
                auth_rate_limit_requests: 5,
                auth_rate_limit_window_secs: 15 * 60,
                enable_request_logging: false,
                max_request_size_bytes: 15 * 1024 * 1024,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                password_memory_kib: 64 * 1024,
                password_iterations: 3,
            },
        }
    }

    /// Whether any origin may call the API.
    pub fn allows_any_origin(&self) -> bool {
        self.security.cors_origins.iter().any(|o| o == "*")
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(!config.api.enable_rate_limiting);
        assert!(config.storage.database_url.is_none());
        assert!(config.allows_any_origin());
        assert_eq!(config.session.sweep_interval_secs, 3600);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.api.enable_rate_limiting);
        assert_eq!(config.api.auth_rate_limit_requests, 5);
        assert_eq!(config.api.auth_rate_limit_window_secs, 900);
        assert!(!config.allows_any_origin());
    }

    #[test]
    fn test_presets_share_request_limit() {
        for config in [AppConfig::development(), AppConfig::staging(), AppConfig::production()] {
            assert_eq!(config.api.max_request_size_bytes, 15 * 1024 * 1024);
        }
    }
}
