//! Balance Auto-Convert
//!
//! Listens to balance-change notifications from a Binance spot account and
//! converts received funds into configured target assets with market orders,
//! routing through a bridge asset when no direct trading pair exists.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod connectors;
pub mod data;
pub mod trading;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use connectors::{BinanceRestClient, MetadataSource, OrderGateway};
pub use data::{AssetSymbol, SymbolCatalog};
pub use trading::{BalanceEventHandler, ConversionRules, TradeDispatcher, TradeJob};
pub use utils::Notifier;

/// Result type used throughout the application
pub type Result<T> = anyhow::Result<T>;

/// Common error types for the conversion service
#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    DataParsing(String),

    /// The exchange answered with a non-success status
    #[error("Exchange rejected request ({status}): {body}")]
    Exchange {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Exchange metadata could not be loaded
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// No tradable route between two assets
    #[error("No route from {from} to {to}")]
    NoRoute {
        /// Source asset
        from: String,
        /// Destination asset
        to: String,
    },

    /// Trade job rejected before reaching the exchange
    #[error("Invalid trade job: {0}")]
    InvalidJob(String),

    /// Timeout error
    #[error("Timeout error: {0}")]
    Timeout(String),
}

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
