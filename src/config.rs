use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub const CONFIG_PATH: &str = "Config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    Parse(PathBuf, toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub connection: ConnectionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub home_page: PathBuf,
}

/// Keep-alive and framing limits for each player connection.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Time allowed to write one frame.
    pub write_wait_ms: u64,
    /// Time allowed between pongs before the peer is considered gone.
    pub pong_wait_ms: u64,
    /// Ping period; must be shorter than `pong_wait_ms`.
    pub ping_period_ms: u64,
    pub max_message_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            home_page: PathBuf::from("static/home.html"),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            write_wait_ms: 10_000,
            pong_wait_ms: 60_000,
            ping_period_ms: 54_000,
            max_message_size: 512,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ConnectionConfig {
    pub fn write_wait(&self) -> Duration {
        Duration::from_millis(self.write_wait_ms)
    }

    pub fn pong_wait(&self) -> Duration {
        Duration::from_millis(self.pong_wait_ms)
    }

    pub fn ping_period(&self) -> Duration {
        Duration::from_millis(self.ping_period_ms)
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AppConfig {
    /// Reads `Config.toml` if present, then applies `CHESSROOM_*` overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(CONFIG_PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?
        } else {
            Self::default()
        };

        config.merge_env();
        config.validate()?;
        Ok(config)
    }

    fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("CHESSROOM_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("CHESSROOM_PORT") {
            if let Ok(parsed) = val.parse() {
                self.server.port = parsed;
            }
        }
        if let Ok(val) = std::env::var("CHESSROOM_HOME_PAGE") {
            self.server.home_page = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("CHESSROOM_WRITE_WAIT_MS") {
            if let Ok(parsed) = val.parse() {
                self.connection.write_wait_ms = parsed;
            }
        }
        if let Ok(val) = std::env::var("CHESSROOM_PONG_WAIT_MS") {
            if let Ok(parsed) = val.parse() {
                self.connection.pong_wait_ms = parsed;
            }
        }
        if let Ok(val) = std::env::var("CHESSROOM_PING_PERIOD_MS") {
            if let Ok(parsed) = val.parse() {
                self.connection.ping_period_ms = parsed;
            }
        }
        if let Ok(val) = std::env::var("CHESSROOM_MAX_MESSAGE_SIZE") {
            if let Ok(parsed) = val.parse() {
                self.connection.max_message_size = parsed;
            }
        }
        if let Ok(val) = std::env::var("CHESSROOM_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("CHESSROOM_LOG_JSON") {
            if let Ok(parsed) = val.parse() {
                self.logging.json = parsed;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let conn = &self.connection;
        if conn.ping_period_ms == 0 || conn.write_wait_ms == 0 {
            return Err(ConfigError::Invalid(
                "ping period and write wait must be non-zero".to_string(),
            ));
        }
        if conn.ping_period_ms >= conn.pong_wait_ms {
            return Err(ConfigError::Invalid(format!(
                "ping period ({} ms) must be shorter than pong wait ({} ms)",
                conn.ping_period_ms, conn.pong_wait_ms
            )));
        }
        if conn.max_message_size == 0 {
            return Err(ConfigError::Invalid(
                "max message size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn log_summary(&self) {
        info!(
            listen = %self.server.listen_addr(),
            home_page = %self.server.home_page.display(),
            "server configuration"
        );
        info!(
            write_wait_ms = self.connection.write_wait_ms,
            pong_wait_ms = self.connection.pong_wait_ms,
            ping_period_ms = self.connection.ping_period_ms,
            max_message_size = self.connection.max_message_size,
            "connection configuration"
        );
    }
}
