//! Integration tests for the conversion pipeline

pub mod test_balance_pipeline;
pub mod test_binance_rest;
pub mod test_notifications;

use async_trait::async_trait;
use autoconvert::{
    connectors::{MarketOrder, OrderGateway, OrderQuantity, OrderReceipt, OrderSide},
    data::{AssetSymbol, SymbolCatalog},
    trading::TradeDispatcher,
    ConvertError, Notifier, Result,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted exchange answer for one order
#[derive(Debug, Clone)]
pub enum Reply {
    /// Order executed with the given executedQty / cummulativeQuoteQty
    Fill {
        executed: String,
        quote: String,
    },
    /// Exchange rejected the order
    Reject(String),
    /// Exchange never answers
    Hang,
}

impl Reply {
    pub fn fill(executed: &str, quote: &str) -> Self {
        Reply::Fill {
            executed: executed.to_string(),
            quote: quote.to_string(),
        }
    }
}

/// Order gateway that records every order and answers from a per-symbol script
#[derive(Default)]
pub struct RecordingGateway {
    orders: Mutex<Vec<MarketOrder>>,
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, symbol: &str, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(symbol.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn orders(&self) -> Vec<MarketOrder> {
        self.orders.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderGateway for RecordingGateway {
    async fn submit_market_order(&self, order: &MarketOrder) -> Result<OrderReceipt> {
        self.orders.lock().unwrap().push(order.clone());

        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&order.symbol)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Reply::Reject(format!("unscripted order on {}", order.symbol)));

        match reply {
            Reply::Fill { executed, quote } => Ok(OrderReceipt {
                symbol: order.symbol.clone(),
                side: order.side,
                executed_qty: executed,
                cummulative_quote_qty: quote,
            }),
            Reply::Reject(body) => Err(ConvertError::Exchange { status: 400, body }.into()),
            Reply::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

/// Test utilities for integration tests
pub struct TestUtils;

impl TestUtils {
    /// Catalog with ETH/USDT, XRP/USDT and ETH/BTC, but no ETH/XRP
    pub fn create_test_catalog() -> Arc<SymbolCatalog> {
        Arc::new(SymbolCatalog::new(vec![
            AssetSymbol::new("ETH", "USDT", 0.0001),
            AssetSymbol::new("XRP", "USDT", 1.0),
            AssetSymbol::new("ETH", "BTC", 0.001),
        ]))
    }

    pub fn create_dispatcher(
        catalog: Arc<SymbolCatalog>,
        gateway: Arc<RecordingGateway>,
        notifier: Notifier,
    ) -> TradeDispatcher {
        TradeDispatcher::new(catalog, gateway, notifier, "USDT", Duration::from_millis(500))
    }

    /// Orders placed on a symbol, in submission order
    pub fn orders_on(orders: &[MarketOrder], symbol: &str) -> Vec<MarketOrder> {
        orders.iter().filter(|o| o.symbol == symbol).cloned().collect()
    }

    pub fn sell(symbol: &str, quantity: f64, precision: u32) -> MarketOrder {
        MarketOrder {
            symbol: symbol.to_string(),
            side: OrderSide::Sell,
            quantity: OrderQuantity::Base(quantity),
            precision,
        }
    }

    pub fn buy(symbol: &str, quote: f64, precision: u32) -> MarketOrder {
        MarketOrder {
            symbol: symbol.to_string(),
            side: OrderSide::Buy,
            quantity: OrderQuantity::Quote(quote),
            precision,
        }
    }
}
