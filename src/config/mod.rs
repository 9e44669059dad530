use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub uri: String,
    pub name: String,
    pub max_pool_size: u32,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Limit applied to list queries that do not ask for one. 0 means no limit.
    pub default_limit: u64,
    pub max_limit: Option<u64>,
    pub max_request_size_bytes: usize,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Token accepted with every permission, bypassing the token collection.
    pub master_key: Option<String>,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

/// Partial configuration as read from a YAML file. Every section is optional
/// and only the keys present replace the environment preset.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    environment: Option<Environment>,
    server: Option<serde_yaml::Value>,
    database: Option<serde_yaml::Value>,
    api: Option<serde_yaml::Value>,
    security: Option<serde_yaml::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::preset(Self::environment_from_env()).with_env_overrides()
    }

    /// Load the preset for `APP_ENV` (or the file's `environment`), overlay the
    /// YAML file, then apply environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        Self::from_yaml_str(&text)
            .map_err(|source| ConfigError::Parse { path: display, source })
            .map(Self::with_env_overrides)
    }

    fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        let file: FileConfig = serde_yaml::from_str(text)?;
        let environment = file
            .environment
            .unwrap_or_else(Self::environment_from_env);
        let mut config = Self::preset(environment);

        if let Some(section) = file.server {
            config.server = merge_section(&config.server, section)?;
        }
        if let Some(section) = file.database {
            config.database = merge_section(&config.database, section)?;
        }
        if let Some(section) = file.api {
            config.api = merge_section(&config.api, section)?;
        }
        if let Some(section) = file.security {
            config.security = merge_section(&config.security, section)?;
        }

        Ok(config)
    }

    fn environment_from_env() -> Environment {
        match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        }
    }

    fn preset(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("KCI_API_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("KCI_API_PORT").or_else(|_| env::var("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Database overrides
        if let Ok(v) = env::var("KCI_DATABASE_BACKEND") {
            match v.as_str() {
                "memory" => self.database.backend = StoreBackend::Memory,
                "mongo" | "mongodb" => self.database.backend = StoreBackend::Mongo,
                other => tracing::warn!("Ignoring unknown KCI_DATABASE_BACKEND '{}'", other),
            }
        }
        if let Ok(v) = env::var("KCI_MONGODB_URI").or_else(|_| env::var("MONGODB_URI")) {
            self.database.uri = v;
        }
        if let Ok(v) = env::var("KCI_MONGODB_DB") {
            self.database.name = v;
        }
        if let Ok(v) = env::var("KCI_DATABASE_MAX_POOL_SIZE") {
            self.database.max_pool_size = v.parse().unwrap_or(self.database.max_pool_size);
        }
        if let Ok(v) = env::var("KCI_DATABASE_CONNECT_TIMEOUT") {
            self.database.connect_timeout_secs =
                v.parse().unwrap_or(self.database.connect_timeout_secs);
        }

        // API overrides
        if let Ok(v) = env::var("KCI_API_DEFAULT_LIMIT") {
            self.api.default_limit = v.parse().unwrap_or(self.api.default_limit);
        }
        if let Ok(v) = env::var("KCI_API_MAX_LIMIT") {
            self.api.max_limit = v.parse().ok();
        }
        if let Ok(v) = env::var("KCI_API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }
        if let Ok(v) = env::var("KCI_API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        // Security overrides
        if let Ok(v) = env::var("KCI_MASTER_KEY") {
            self.security.master_key = Some(v).filter(|k| !k.trim().is_empty());
        }
        if let Ok(v) = env::var("KCI_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("KCI_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8888,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Mongo,
                uri: "mongodb://localhost:27017".to_string(),
                name: "kernel-ci".to_string(),
                max_pool_size: 10,
                connect_timeout_secs: 5,
            },
            api: ApiConfig {
                default_limit: 0,
                max_limit: None,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
                enable_request_logging: true,
            },
            security: SecurityConfig {
                master_key: None,
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string()],
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8888,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Mongo,
                uri: "mongodb://localhost:27017".to_string(),
                name: "kernel-ci".to_string(),
                max_pool_size: 50,
                connect_timeout_secs: 5,
            },
            api: ApiConfig {
                default_limit: 0,
                max_limit: Some(1000),
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
                enable_request_logging: true,
            },
            security: SecurityConfig {
                master_key: None,
                enable_cors: true,
                cors_origins: vec!["https://staging.kernelci.org".to_string()],
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8888,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Mongo,
                uri: "mongodb://localhost:27017".to_string(),
                name: "kernel-ci".to_string(),
                max_pool_size: 100,
                connect_timeout_secs: 3,
            },
            api: ApiConfig {
                default_limit: 0,
                max_limit: Some(500),
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
                enable_request_logging: false,
            },
            security: SecurityConfig {
                master_key: None,
                enable_cors: false,
                cors_origins: Vec::new(),
            },
        }
    }
}

/// Overlay the keys of a YAML mapping onto an already populated section.
fn merge_section<T>(base: &T, overlay: serde_yaml::Value) -> Result<T, serde_yaml::Error>
where
    T: Serialize + serde::de::DeserializeOwned,
{
    let mut merged = serde_yaml::to_value(base)?;
    if let (serde_yaml::Value::Mapping(target), serde_yaml::Value::Mapping(source)) =
        (&mut merged, overlay)
    {
        for (key, value) in source {
            target.insert(key, value);
        }
    }
    serde_yaml::from_value(merged)
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
