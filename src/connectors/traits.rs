//! Exchange collaborator traits and common types

use crate::{data::AssetSymbol, ConvertError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Source of the tradable symbol list
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetch every tradable symbol with its quantity step
    async fn fetch_symbols(&self) -> Result<Vec<AssetSymbol>>;
}

/// Submits market orders
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Place a market order and wait for its result
    async fn submit_market_order(&self, order: &MarketOrder) -> Result<OrderReceipt>;
}

/// Manages the listen key of a user data stream
#[async_trait]
pub trait UserStreamSession: Send + Sync {
    /// Open a session and return its listen key
    async fn start_user_stream(&self) -> Result<String>;

    /// Extend the lifetime of a listen key
    async fn keepalive_user_stream(&self, listen_key: &str) -> Result<()>;
}

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    /// Buy order
    Buy,
    /// Sell order
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// How much a market order trades
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderQuantity {
    /// Amount of the base asset to sell
    Base(f64),
    /// Amount of the quote asset to spend
    Quote(f64),
}

impl OrderQuantity {
    /// Exchange parameter carrying this quantity
    pub fn param_name(&self) -> &'static str {
        match self {
            OrderQuantity::Base(_) => "quantity",
            OrderQuantity::Quote(_) => "quoteOrderQty",
        }
    }

    /// Raw value
    pub fn value(&self) -> f64 {
        match self {
            OrderQuantity::Base(v) | OrderQuantity::Quote(v) => *v,
        }
    }
}

/// Market order request
#[derive(Debug, Clone, PartialEq)]
pub struct MarketOrder {
    /// Trading symbol
    pub symbol: String,
    /// Order side
    pub side: OrderSide,
    /// Base quantity for sells, quote spend for buys
    pub quantity: OrderQuantity,
    /// Decimal places used when formatting the quantity
    pub precision: u32,
}

impl MarketOrder {
    /// Quantity rendered with the symbol's precision
    pub fn formatted_quantity(&self) -> String {
        format!("{:.*}", self.precision as usize, self.quantity.value())
    }
}

/// Result of a submitted market order, amounts as reported by the exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    /// Symbol traded
    pub symbol: String,
    /// Side traded
    pub side: OrderSide,
    /// Executed base quantity
    pub executed_qty: String,
    /// Cumulative quote quantity filled
    pub cummulative_quote_qty: String,
}

impl OrderReceipt {
    /// Amount received in the order's destination asset: quote proceeds for
    /// a sell, base quantity for a buy.
    pub fn proceeds(&self) -> Result<f64> {
        let (field, raw) = match self.side {
            OrderSide::Sell => ("cummulativeQuoteQty", &self.cummulative_quote_qty),
            OrderSide::Buy => ("executedQty", &self.executed_qty),
        };

        let value: f64 = raw.trim().parse().map_err(|e| {
            ConvertError::DataParsing(format!("Unparsable {} '{}': {}", field, raw, e))
        })?;

        if !value.is_finite() || value < 0.0 {
            return Err(ConvertError::DataParsing(format!("Invalid {} '{}'", field, raw)).into());
        }

        Ok(value)
    }
}

/// Balance change pushed by the user data stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceChangeEvent {
    /// Asset whose balance changed
    pub asset: String,
    /// Signed change amount
    pub change: f64,
}

impl BalanceChangeEvent {
    /// Create an event
    pub fn new(asset: &str, change: f64) -> Self {
        Self {
            asset: asset.to_string(),
            change,
        }
    }
}
