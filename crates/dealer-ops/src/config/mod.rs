use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::inspection::{EditRequestPolicy, InspectionWorkflowConfig};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub store: StoreConfig,
    pub workflow: InspectionWorkflowConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let backend = match env::var("DEALER_STORE_BACKEND") {
            Ok(raw) => StoreBackend::parse(&raw).ok_or(ConfigError::InvalidStoreBackend(raw))?,
            Err(_) => StoreBackend::Memory,
        };
        let path = env::var("DEALER_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_STORE_PATH));

        let edit_policy = match env::var("DEALER_EDIT_POLICY") {
            Ok(raw) => EditRequestPolicy::parse(&raw).ok_or(ConfigError::InvalidEditPolicy(raw))?,
            Err(_) => EditRequestPolicy::default(),
        };
        let refresh_interval = match env::var("DEALER_REFRESH_SECS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidRefreshInterval),
            },
            Err(_) => InspectionWorkflowConfig::default().refresh_interval,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            store: StoreConfig { backend, path },
            workflow: InspectionWorkflowConfig {
                edit_policy,
                refresh_interval,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

pub const DEFAULT_STORE_PATH: &str = "dealer-store.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    File,
}

impl StoreBackend {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" | "mock" => Some(Self::Memory),
            "file" | "json" => Some(Self::File),
            _ => None,
        }
    }
}

/// Where vehicle and inspection records live.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Only read by the file backend.
    pub path: PathBuf,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidStoreBackend(String),
    InvalidEditPolicy(String),
    InvalidRefreshInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidStoreBackend(value) => write!(
                f,
                "DEALER_STORE_BACKEND must be 'memory' or 'file' (found '{value}')"
            ),
            ConfigError::InvalidEditPolicy(value) => write!(
                f,
                "DEALER_EDIT_POLICY must be 'counterpart_approval' or 'manager_self_approves' (found '{value}')"
            ),
            ConfigError::InvalidRefreshInterval => {
                write!(f, "DEALER_REFRESH_SECS must be a positive number of seconds")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidStoreBackend(_)
            | ConfigError::InvalidEditPolicy(_)
            | ConfigError::InvalidRefreshInterval => None,
        }
    }
}
