//! Configuration module for the queue backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::{FixedOffset, Local, Offset, Utc};

use crate::errors::AppError;
use crate::queue::NumberingMode;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (required in production)
    pub api_psk: Option<String>,
    /// Admin key guarding account management
    pub admin_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of text
    pub log_json: bool,
    /// How ticket numbers are generated
    pub numbering: NumberingMode,
    /// Offset of the local day used for numbering and reports
    pub utc_offset: FixedOffset,
    /// Completion requires a service type
    pub require_service_type: bool,
    /// Number of previous calls shown on displays
    pub display_history: usize,
    /// Buffer size of the change feed
    pub feed_capacity: usize,
    /// Email of a super admin created at startup if missing
    pub seed_admin_email: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let api_psk = non_empty("QUEUE_API_PSK");
        let admin_psk = non_empty("QUEUE_ADMIN_PSK");

        let db_path = env::var("QUEUE_DB_PATH")
            .unwrap_or_else(|_| "./data/queue.sqlite".to_string())
            .into();

        let bind_addr = env::var("QUEUE_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|_| AppError::Configuration("Invalid QUEUE_BIND_ADDR format".to_string()))?;

        let log_level = env::var("QUEUE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_json = match env::var("QUEUE_LOG_FORMAT") {
            Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
                "json" => true,
                "text" | "" => false,
                _ => {
                    return Err(AppError::Configuration(format!(
                        "Unknown QUEUE_LOG_FORMAT: {}",
                        value
                    )))
                }
            },
            Err(_) => false,
        };

        let numbering = match env::var("QUEUE_NUMBERING") {
            Ok(value) => NumberingMode::parse(&value).ok_or_else(|| {
                AppError::Configuration(format!("Unknown QUEUE_NUMBERING mode: {}", value))
            })?,
            Err(_) => NumberingMode::Sequence,
        };

        let utc_offset = match env::var("QUEUE_UTC_OFFSET_MINUTES") {
            Ok(value) => parse_offset(&value)?,
            Err(_) => Local::now().offset().fix(),
        };

        let require_service_type = match env::var("QUEUE_REQUIRE_SERVICE_TYPE") {
            Ok(value) => parse_bool(&value).ok_or_else(|| {
                AppError::Configuration(format!("Invalid QUEUE_REQUIRE_SERVICE_TYPE: {}", value))
            })?,
            Err(_) => true,
        };

        let display_history = parse_usize("QUEUE_DISPLAY_HISTORY", 3)?;
        let feed_capacity = parse_usize("QUEUE_FEED_CAPACITY", 256)?.max(1);
        let seed_admin_email = non_empty("QUEUE_SEED_ADMIN_EMAIL");

        Ok(Self {
            api_psk,
            admin_psk,
            db_path,
            bind_addr,
            log_level,
            log_json,
            numbering,
            utc_offset,
            require_service_type,
            display_history,
            feed_capacity,
            seed_admin_email,
        })
    }
}

impl Default for Config {
    /// Development defaults: no keys, UTC days.
    fn default() -> Self {
        Self {
            api_psk: None,
            admin_psk: None,
            db_path: PathBuf::from("./data/queue.sqlite"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: "info".to_string(),
            log_json: false,
            numbering: NumberingMode::Sequence,
            utc_offset: Utc.fix(),
            require_service_type: true,
            display_history: 3,
            feed_capacity: 256,
            seed_admin_email: None,
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_usize(key: &str, default: usize) -> Result<usize, AppError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| AppError::Configuration(format!("Invalid {}: {}", key, value))),
        Err(_) => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_offset(value: &str) -> Result<FixedOffset, AppError> {
    let minutes: i32 = value.trim().parse().map_err(|_| {
        AppError::Configuration(format!("Invalid QUEUE_UTC_OFFSET_MINUTES: {}", value))
    })?;
    FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
        AppError::Configuration(format!("QUEUE_UTC_OFFSET_MINUTES out of range: {}", value))
    })
}
