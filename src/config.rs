use std::path::Path;

use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub refresh: RefreshConfig,
    pub nlp: NlpConfig,
    pub display: DisplayConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

/// Background refresh settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Seconds between refresh ticks
    pub interval_secs: u64,
    /// Upper bound on a single tick; `None` waits forever
    pub tick_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NlpConfig {
    pub max_text_length: usize,
}

/// Presentation settings for chart reshaping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Hours added to stored timestamps before they are shown
    pub timezone_offset_hours: i64,
    pub news_rows: usize,
    pub max_words: usize,
    /// Words never shown in the word cloud
    pub stopwords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:data/news.db".to_string(),
            max_connections: 10,
            connection_timeout_secs: 30,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timezone_offset_hours: 3,
            news_rows: 6,
            max_words: 100,
            stopwords: ["TJ", "РИА", "Новости", "Медуза", "РБК", "Pro", "СМИ", "Тренд"]
                .into_iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
            refresh: RefreshConfig {
                interval_secs: 600,
                tick_timeout_secs: Some(300),
            },
            nlp: NlpConfig {
                max_text_length: 10000,
            },
            display: DisplayConfig::default(),
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8050,
            },
        }
    }
}

fn invalid(message: impl Into<String>) -> DashboardError {
    DashboardError::InvalidConfig(message.into())
}

impl DatabaseConfig {
    fn validate(&self) -> std::result::Result<(), DashboardError> {
        if self.url.trim().is_empty() {
            return Err(invalid("database.url cannot be empty"));
        }
        if self.max_connections == 0 || self.connection_timeout_secs == 0 {
            return Err(invalid(
                "database.max_connections and database.connection_timeout_secs must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl LoggingConfig {
    const LEVELS: [&'static str; 5] = ["trace", "debug", "info", "warn", "error"];
    const FORMATS: [&'static str; 2] = ["text", "json"];

    fn validate(&self) -> std::result::Result<(), DashboardError> {
        if !Self::LEVELS.contains(&self.level.as_str()) {
            return Err(invalid(format!(
                "logging.level {:?} is not one of {:?}",
                self.level,
                Self::LEVELS
            )));
        }
        if !Self::FORMATS.contains(&self.format.as_str()) {
            return Err(invalid(format!(
                "logging.format {:?} is not one of {:?}",
                self.format,
                Self::FORMATS
            )));
        }
        Ok(())
    }
}

impl RefreshConfig {
    fn validate(&self) -> std::result::Result<(), DashboardError> {
        if self.interval_secs == 0 {
            return Err(invalid("refresh.interval_secs must be greater than 0"));
        }
        if self.tick_timeout_secs == Some(0) {
            return Err(invalid("refresh.tick_timeout_secs must be greater than 0 when set"));
        }
        Ok(())
    }
}

impl DisplayConfig {
    fn validate(&self) -> std::result::Result<(), DashboardError> {
        if !(-14..=14).contains(&self.timezone_offset_hours) {
            return Err(invalid(format!(
                "display.timezone_offset_hours must be within -14..=14, got {}",
                self.timezone_offset_hours
            )));
        }
        if self.news_rows == 0 || self.max_words == 0 {
            return Err(invalid("display.news_rows and display.max_words must be greater than 0"));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence, optionally
    /// layering an explicit file over the defaults and config directory
    pub fn load_from(explicit_file: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&Self::default())
            .map_err(|e| anyhow::anyhow!("Failed to serialize default configuration: {}", e))?;

        let mut builder = Config::builder()
            // Start with default values
            .add_source(defaults)
            // Add config files if they exist
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = explicit_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            // Add environment variables with prefix, e.g. NEWS_DASHBOARD__REFRESH__INTERVAL_SECS
            .add_source(
                Environment::with_prefix("NEWS_DASHBOARD")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("display.stopwords"),
            )
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate every section, stopping at the first problem
    pub fn validate(&self) -> Result<()> {
        self.database.validate()?;
        self.logging.validate()?;
        self.refresh.validate()?;
        self.display.validate()?;

        if self.nlp.max_text_length == 0 {
            return Err(invalid("nlp.max_text_length must be greater than 0").into());
        }
        if self.server.port == 0 {
            return Err(invalid("server.port must be greater than 0").into());
        }
        Ok(())
    }

    /// Get database URL from environment or config
    pub fn get_database_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| self.database.url.clone())
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}
