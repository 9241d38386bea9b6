use crate::auction::TierBasis;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

pub const DEFAULT_DATA_PATHS: [&str; 2] = ["data/cases.csv", "data/sample_onbid.csv"];
pub const DEFAULT_SAMPLE_PATH: &str = "data/sample_onbid.csv";
pub const DEFAULT_API_TOKEN: &str = crate::auction::source::SAMPLE_TOKEN;
/// Largest CSV body the upload route buffers.
pub const DEFAULT_UPLOAD_LIMIT_BYTES: usize = 64 * 1024 * 1024;

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

/// Top-level configuration for the dashboard service and CLI.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub dashboard: DashboardConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            dashboard: DashboardConfig::from_env()?,
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where case data comes from and how it is scored.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Ranked candidates; the first existing file is loaded.
    pub data_paths: Vec<PathBuf>,
    /// Auction listings joined onto the cases when set.
    pub listings_path: Option<PathBuf>,
    pub sample_path: PathBuf,
    pub tier_basis: TierBasis,
    pub api_token: String,
    pub upload_limit_bytes: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_paths: DEFAULT_DATA_PATHS.iter().map(PathBuf::from).collect(),
            listings_path: None,
            sample_path: PathBuf::from(DEFAULT_SAMPLE_PATH),
            tier_basis: TierBasis::default(),
            api_token: DEFAULT_API_TOKEN.to_string(),
            upload_limit_bytes: DEFAULT_UPLOAD_LIMIT_BYTES,
        }
    }
}

impl DashboardConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(paths) = env::var_os("DASHBOARD_DATA_PATHS") {
            let parsed: Vec<PathBuf> = env::split_paths(&paths)
                .filter(|path| !path.as_os_str().is_empty())
                .collect();
            if !parsed.is_empty() {
                config.data_paths = parsed;
            }
        }

        config.listings_path = env::var_os("DASHBOARD_LISTINGS_PATH")
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        if let Ok(basis) = env::var("DASHBOARD_TIER_BASIS") {
            config.tier_basis = basis
                .parse()
                .map_err(|_| ConfigError::InvalidTierBasis { value: basis })?;
        }

        if let Ok(limit) = env::var("DASHBOARD_UPLOAD_LIMIT_BYTES") {
            let parsed = limit.trim().parse::<usize>().ok().filter(|bytes| *bytes > 0);
            config.upload_limit_bytes =
                parsed.ok_or(ConfigError::InvalidUploadLimit { value: limit })?;
        }

        if let Some(path) = env::var_os("ONBID_SAMPLE_PATH").filter(|path| !path.is_empty()) {
            config.sample_path = PathBuf::from(path);
        }

        if let Ok(token) = env::var("ONBID_API_TOKEN") {
            if !token.trim().is_empty() {
                config.api_token = token;
            }
        }

        Ok(config)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTierBasis { value: String },
    InvalidUploadLimit { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTierBasis { value } => write!(
                f,
                "DASHBOARD_TIER_BASIS must be 'score' or 'amount', got '{}'",
                value
            ),
            ConfigError::InvalidUploadLimit { value } => write!(
                f,
                "DASHBOARD_UPLOAD_LIMIT_BYTES must be a positive byte count, got '{}'",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort
            | ConfigError::InvalidTierBasis { .. }
            | ConfigError::InvalidUploadLimit { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
