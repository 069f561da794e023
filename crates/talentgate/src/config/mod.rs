use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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
    pub classifier: ClassifierConfig,
    pub signature: SignatureConfig,
    pub scoring_service: ScoringServiceConfig,
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

        let classifier = ClassifierConfig {
            endpoint: env::var("CLASSIFIER_API_URL").ok(),
            fallback_endpoint: env::var("CLASSIFIER_FALLBACK_URL").ok(),
            api_key: env::var("CLASSIFIER_API_KEY").ok(),
        };

        let signature = SignatureConfig {
            endpoint: env::var("SIGNATURE_API_URL").ok(),
            api_key: env::var("SIGNATURE_API_KEY").ok(),
            webhook_secret: env::var("SIGNATURE_WEBHOOK_SECRET")
                .unwrap_or_else(|_| "insecure-dev-secret".to_string()),
        };

        let poll_pause_ms = env::var("SCORING_POLL_PAUSE_MS")
            .unwrap_or_else(|_| "250".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidPollPause)?;

        let scoring_service = ScoringServiceConfig {
            endpoint: env::var("SCORING_API_URL").ok(),
            api_key: env::var("SCORING_API_KEY").ok(),
            poll_pause_ms,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            classifier,
            signature,
            scoring_service,
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

/// Connection details for the document classification providers.
///
/// Both endpoints are optional: with neither configured the service falls
/// back to the offline keyword classifier shipped by the API crate.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub endpoint: Option<String>,
    pub fallback_endpoint: Option<String>,
    pub api_key: Option<String>,
}

/// Connection details for the e-signature provider plus the shared secret
/// used to authenticate its webhooks.
#[derive(Debug, Clone)]
pub struct SignatureConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub webhook_secret: String,
}

/// Connection details for the external scoring service and the pause
/// inserted between reconciliation polls to respect its rate limits.
#[derive(Debug, Clone)]
pub struct ScoringServiceConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub poll_pause_ms: u64,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidPollPause,
    InvalidHost { source: std::net::AddrParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidPollPause => {
                write!(f, "SCORING_POLL_PAUSE_MS must be a valid u64")
            }
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidPollPause => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
