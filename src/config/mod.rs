//! Configuration management module

pub mod settings;

pub use settings::*;

use crate::{ConvertError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Main configuration structure for the conversion service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Exchange connection and credentials
    pub exchange: ExchangeConfig,
    /// Conversion rules
    pub conversion: ConversionConfig,
    /// Order execution settings
    pub execution: ExecutionConfig,
    /// Streaming session settings
    pub session: SessionConfig,
    /// Telegram notifications
    pub telegram: TelegramConfig,
    /// Monitoring settings
    pub monitoring: MonitoringConfig,
}

/// Exchange connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// REST API URL
    pub rest_api_url: String,
    /// WebSocket base URL
    pub websocket_url: String,
    /// API key
    pub api_key: String,
    /// Secret key
    pub secret_key: String,
    /// recvWindow sent with signed requests
    pub recv_window_ms: u64,
    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Conversion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Intermediate asset for two-hop conversions
    pub bridge_asset: String,
    /// Source asset -> destination asset -> percentage of each received amount.
    /// File order is allocation order.
    pub rules: IndexMap<String, IndexMap<String, f64>>,
}

/// Execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Order submission timeout in milliseconds
    pub order_timeout_ms: u64,
    /// Capacity of the trade job queue
    pub queue_capacity: usize,
}

/// User data stream session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Listen key keep-alive interval in seconds
    pub keepalive_interval_secs: u64,
    /// Delay after a failed keep-alive in seconds
    pub retry_delay_secs: u64,
    /// Delay before re-connecting a closed stream in seconds
    pub reconnect_delay_secs: u64,
}

/// Telegram notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot API base URL
    pub api_url: String,
    /// Bot token, notifications are disabled without it
    pub bot_token: Option<String>,
    /// Chat receiving notifications
    pub chat_id: Option<i64>,
}

/// Monitoring configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Port for the Prometheus exporter, disabled when unset
    pub metrics_port: Option<u16>,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            rest_api_url: ConfigDefaults::REST_API_URL.to_string(),
            websocket_url: ConfigDefaults::WEBSOCKET_URL.to_string(),
            api_key: String::new(),
            secret_key: String::new(),
            recv_window_ms: ConfigDefaults::RECV_WINDOW_MS,
            request_timeout_secs: ConfigDefaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        let mut eth = IndexMap::new();
        eth.insert("USDT".to_string(), 100.0);
        let mut rules = IndexMap::new();
        rules.insert("ETH".to_string(), eth);

        Self {
            bridge_asset: ConfigDefaults::BRIDGE_ASSET.to_string(),
            rules,
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            order_timeout_ms: ConfigDefaults::ORDER_TIMEOUT_MS,
            queue_capacity: ConfigDefaults::QUEUE_CAPACITY,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keepalive_interval_secs: ConfigDefaults::KEEPALIVE_INTERVAL_SECS,
            retry_delay_secs: ConfigDefaults::RETRY_DELAY_SECS,
            reconnect_delay_secs: ConfigDefaults::RECONNECT_DELAY_SECS,
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_url: ConfigDefaults::TELEGRAM_API_URL.to_string(),
            bot_token: None,
            chat_id: None,
        }
    }
}

impl TelegramConfig {
    /// Whether both a bot token and a chat id are configured
    pub fn is_enabled(&self) -> bool {
        self.bot_token.as_deref().map_or(false, |t| !t.is_empty()) && self.chat_id.is_some()
    }
}

impl ExecutionConfig {
    /// Order submission timeout
    pub fn order_timeout(&self) -> Duration {
        Duration::from_millis(self.order_timeout_ms)
    }
}

impl SessionConfig {
    /// Keep-alive interval
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }

    /// Delay after a failed keep-alive
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// Delay before re-connecting the stream
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConvertError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: AppConfig = toml::from_str(&content)
            .map_err(|e| ConvertError::Config(format!("Failed to parse config: {}", e)))?;

        config.expand_env_vars()?;

        Ok(config)
    }

    /// Load configuration, falling back to built-in defaults when the file
    /// is missing or malformed. Environment overrides apply either way.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let mut config = match Self::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Could not load {}: {}. Using default config",
                    path.as_ref().display(),
                    e
                );
                Self::default()
            }
        };
        config.apply_env_overrides();
        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        ConfigValidator::validate_url(&self.exchange.rest_api_url, "exchange.rest_api_url")?;
        ConfigValidator::validate_url(&self.exchange.websocket_url, "exchange.websocket_url")?;
        ConfigValidator::validate_non_zero(self.exchange.request_timeout_secs, "exchange.request_timeout_secs")?;

        ConfigValidator::validate_asset(&self.conversion.bridge_asset)?;
        for (source, targets) in &self.conversion.rules {
            ConfigValidator::validate_asset(source)?;
            let mut total = 0.0;
            for (target, percent) in targets {
                ConfigValidator::validate_asset(target)?;
                ConfigValidator::validate_allocation(*percent, &format!("conversion.rules.{}.{}", source, target))?;
                if source.eq_ignore_ascii_case(target) {
                    return Err(ConvertError::Config(format!(
                        "Rule for {} converts into itself",
                        source
                    ))
                    .into());
                }
                total += percent;
            }
            if total > 100.0 {
                warn!(
                    "Allocations for {} sum to {}%, orders beyond the received amount will fail",
                    source, total
                );
            }
        }

        ConfigValidator::validate_non_zero(self.execution.order_timeout_ms, "execution.order_timeout_ms")?;
        ConfigValidator::validate_non_zero(self.execution.queue_capacity as u64, "execution.queue_capacity")?;
        ConfigValidator::validate_non_zero(self.session.keepalive_interval_secs, "session.keepalive_interval_secs")?;

        Ok(())
    }

    /// Expand environment variables in configuration strings
    fn expand_env_vars(&mut self) -> Result<()> {
        EnvExpander::expand_in_place(&mut self.exchange.rest_api_url)?;
        EnvExpander::expand_in_place(&mut self.exchange.websocket_url)?;
        EnvExpander::expand_in_place(&mut self.exchange.api_key)?;
        EnvExpander::expand_in_place(&mut self.exchange.secret_key)?;
        if let Some(token) = self.telegram.bot_token.as_mut() {
            EnvExpander::expand_in_place(token)?;
        }
        Ok(())
    }

    /// Credentials from the environment take precedence over the file
    pub fn apply_env_overrides(&mut self) {
        if let Some(key) = EnvExpander::non_empty("BINANCE_API_KEY") {
            self.exchange.api_key = key;
        }
        if let Some(secret) = EnvExpander::non_empty("BINANCE_SECRET_KEY") {
            self.exchange.secret_key = secret;
        }
        if let Some(token) = EnvExpander::non_empty("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Some(chat) = EnvExpander::non_empty("TELEGRAM_CHAT_ID") {
            match chat.trim().parse::<i64>() {
                Ok(id) => self.telegram.chat_id = Some(id),
                Err(_) => warn!("Ignoring malformed TELEGRAM_CHAT_ID: {}", chat),
            }
        }
    }
}
