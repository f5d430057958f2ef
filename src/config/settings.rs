//! Application settings and configuration structures.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Database configuration (PostgreSQL)
    pub database: DatabaseSettings,

    /// Redis configuration
    pub redis: RedisSettings,

    /// JWT authentication settings
    pub jwt: JwtSettings,

    /// Snowflake ID generator settings
    pub snowflake: SnowflakeSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// WebSocket configuration
    pub websocket: WebSocketSettings,

    /// Activity feed configuration
    pub activity: ActivitySettings,

    /// Optional bootstrap admin account
    #[serde(default)]
    pub admin: AdminSettings,

    /// Log output configuration
    pub log: LogSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,

    /// Run embedded migrations on startup
    pub run_migrations: bool,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis connection URL
    pub url: String,
}

/// JWT authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for signing tokens
    pub secret: String,

    /// Access token expiry in minutes
    pub access_token_expiry_minutes: i64,

    /// Refresh token expiry in days
    pub refresh_token_expiry_days: i64,
}

/// Snowflake ID generator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SnowflakeSettings {
    /// Machine/worker ID (0-31)
    pub machine_id: u16,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins (comma-separated in env)
    pub allowed_origins: Vec<String>,
}

/// WebSocket configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketSettings {
    /// Maximum message size in bytes (default: 64KB)
    pub max_message_size: usize,

    /// Interval clients are told to ping at, in milliseconds
    pub heartbeat_interval_ms: u64,

    /// Extra silence tolerated past the heartbeat interval before closing
    pub idle_grace_ms: u64,

    /// Capacity of the fan-out channel; slower sockets drop events past this
    pub broadcast_capacity: usize,
}

impl WebSocketSettings {
    /// How long a socket may stay silent before it is closed.
    pub fn idle_timeout_ms(&self) -> u64 {
        self.heartbeat_interval_ms + self.idle_grace_ms
    }
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            max_message_size: 65536,
            heartbeat_interval_ms: 25000,
            idle_grace_ms: 20000,
            broadcast_capacity: 1024,
        }
    }
}

/// Activity feed configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivitySettings {
    /// Number of activities kept in the Redis recent list
    pub recent_cache_size: usize,

    /// Redis key of the recent list
    pub recent_cache_key: String,
}

/// Bootstrap admin credentials. Both must be set for the admin to be created.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminSettings {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl AdminSettings {
    /// Returns `(name, email, password)` when bootstrap credentials are configured.
    pub fn credentials(&self) -> Option<(&str, &str, &str)> {
        match (&self.email, &self.password) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => Some((
                self.name.as_deref().unwrap_or("Administrator"),
                email.as_str(),
                password.as_str(),
            )),
            _ => None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Log configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub format: LogFormat,
}

/// Minimum required length for JWT secret (256 bits = 32 bytes)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. config/default.toml (base configuration)
    /// 2. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 3. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if JWT secret is too short.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        let builder = Self::with_defaults(Config::builder(), &environment)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__SERVER__PORT=3000 -> server.port = 3000
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("redis.url", std::env::var("REDIS_URL").ok())?
            .set_override_option("jwt.secret", std::env::var("JWT_SECRET").ok())?;

        builder
            .build()?
            .try_deserialize()
            .and_then(Self::validate)
    }

    /// Apply built-in defaults to a config builder.
    pub(crate) fn with_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        environment: &str,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("environment", environment)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("database.run_migrations", true)?
            .set_default("jwt.access_token_expiry_minutes", 60)?
            .set_default("jwt.refresh_token_expiry_days", 7)?
            .set_default("snowflake.machine_id", 1)?
            .set_default("cors.allowed_origins", vec!["http://localhost:5173"])?
            .set_default("websocket.max_message_size", 65536_i64)?
            .set_default("websocket.heartbeat_interval_ms", 25000_i64)?
            .set_default("websocket.idle_grace_ms", 20000_i64)?
            .set_default("websocket.broadcast_capacity", 1024_i64)?
            .set_default("activity.recent_cache_size", 100_i64)?
            .set_default("activity.recent_cache_key", "crm:activities:recent")?
            .set_default("log.format", "pretty")
    }

    fn validate(settings: Self) -> Result<Self, ConfigError> {
        if settings.jwt.secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::Message(format!(
                "JWT secret must be at least {} characters. Current length: {}",
                MIN_JWT_SECRET_LENGTH,
                settings.jwt.secret.len()
            )));
        }
        if settings.websocket.broadcast_capacity == 0 {
            return Err(ConfigError::Message(
                "websocket.broadcast_capacity must be greater than zero".into(),
            ));
        }
        Ok(settings)
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl ServerSettings {
    /// Get the socket address for binding.
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn build(overrides: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let mut builder = Settings::with_defaults(Config::builder(), "test")?
            .set_override("database.url", "postgres://localhost/crm")?
            .set_override("redis.url", "redis://localhost")?
            .set_override("jwt.secret", "0123456789abcdef0123456789abcdef")?;
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }
        builder.build()?.try_deserialize().and_then(Settings::validate)
    }

    #[test]
    fn defaults_deserialize() {
        let settings = build(&[]).unwrap();
        assert_eq!(settings.server.port, 5000);
        assert_eq!(settings.websocket.idle_timeout_ms(), 45000);
        assert_eq!(settings.activity.recent_cache_size, 100);
        assert_eq!(settings.log.format, LogFormat::Pretty);
        assert!(settings.admin.credentials().is_none());
    }

    #[test]
    fn short_jwt_secret_is_rejected() {
        let err = build(&[("jwt.secret", "short")]).unwrap_err();
        assert!(err.to_string().contains("JWT secret"));
    }

    #[test]
    fn admin_credentials_need_email_and_password() {
        let settings = build(&[
            ("admin.email", "admin@example.com"),
            ("admin.password", "changeme123"),
        ])
        .unwrap();
        assert_eq!(
            settings.admin.credentials(),
            Some(("Administrator", "admin@example.com", "changeme123"))
        );
    }

    #[test]
    fn json_log_format_parses() {
        let settings = build(&[("log.format", "json")]).unwrap();
        assert_eq!(settings.log.format, LogFormat::Json);
    }
}
