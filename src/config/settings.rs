//! Settings management utilities

use crate::{ConvertError, Result};
use std::env;

/// Environment variable expansion utility
pub struct EnvExpander;

impl EnvExpander {
    /// Expand environment variables in a string
    /// Supports the ${VAR_NAME} pattern
    pub fn expand(input: &str) -> Result<String> {
        let mut result = input.to_string();

        while let Some(start) = result.find("${") {
            if let Some(end) = result[start..].find('}') {
                let var_name = &result[start + 2..start + end];
                let var_value = env::var(var_name).map_err(|_| {
                    ConvertError::Config(format!("Environment variable '{}' not found", var_name))
                })?;

                result.replace_range(start..start + end + 1, &var_value);
            } else {
                return Err(ConvertError::Config(
                    "Unclosed environment variable reference".to_string(),
                )
                .into());
            }
        }

        Ok(result)
    }

    /// Expand a value in place
    pub fn expand_in_place(value: &mut String) -> Result<()> {
        if value.contains("${") {
            *value = Self::expand(value)?;
        }
        Ok(())
    }

    /// Read a non-empty environment variable
    pub fn non_empty(name: &str) -> Option<String> {
        env::var(name).ok().filter(|v| !v.trim().is_empty())
    }
}

/// Configuration validation utilities
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate an asset code such as `ETH` or `USDT`
    pub fn validate_asset(asset: &str) -> Result<()> {
        if asset.is_empty() {
            return Err(ConvertError::Config("Asset cannot be empty".to_string()).into());
        }

        if !asset.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConvertError::Config(format!(
                "Asset '{}' must contain only alphanumeric characters",
                asset
            ))
            .into());
        }

        Ok(())
    }

    /// Validate an allocation percentage. Values above 100 are accepted.
    pub fn validate_allocation(value: f64, name: &str) -> Result<()> {
        if !value.is_finite() || value <= 0.0 {
            return Err(ConvertError::Config(format!(
                "{} must be a positive percentage, got {}",
                name, value
            ))
            .into());
        }
        Ok(())
    }

    /// Validate a non-zero duration or size
    pub fn validate_non_zero(value: u64, name: &str) -> Result<()> {
        if value == 0 {
            return Err(ConvertError::Config(format!("{} must be greater than 0", name)).into());
        }
        Ok(())
    }

    /// Validate a URL format
    pub fn validate_url(url: &str, name: &str) -> Result<()> {
        if url.is_empty() {
            return Err(ConvertError::Config(format!("{} cannot be empty", name)).into());
        }

        if !url.starts_with("http://")
            && !url.starts_with("https://")
            && !url.starts_with("wss://")
            && !url.starts_with("ws://")
        {
            return Err(ConvertError::Config(format!("{} must be a valid URL", name)).into());
        }

        Ok(())
    }
}

/// Configuration defaults
pub struct ConfigDefaults;

impl ConfigDefaults {
    /// Binance spot REST endpoint
    pub const REST_API_URL: &'static str = "https://api.binance.com";

    /// Binance spot WebSocket endpoint
    pub const WEBSOCKET_URL: &'static str = "wss://stream.binance.com:9443";

    /// Telegram Bot API endpoint
    pub const TELEGRAM_API_URL: &'static str = "https://api.telegram.org";

    /// Asset used to route conversions without a direct pair
    pub const BRIDGE_ASSET: &'static str = "USDT";

    /// Signed request validity window in milliseconds
    pub const RECV_WINDOW_MS: u64 = 5000;

    /// HTTP request timeout in seconds
    pub const REQUEST_TIMEOUT_SECS: u64 = 10;

    /// Order submission timeout in milliseconds
    pub const ORDER_TIMEOUT_MS: u64 = 15_000;

    /// Trade job queue capacity
    pub const QUEUE_CAPACITY: usize = 64;

    /// Listen key keep-alive interval (30 minutes)
    pub const KEEPALIVE_INTERVAL_SECS: u64 = 30 * 60;

    /// Delay after a failed keep-alive
    pub const RETRY_DELAY_SECS: u64 = 60;

    /// Delay before re-connecting a dropped user data stream
    pub const RECONNECT_DELAY_SECS: u64 = 5;
}
