//! Binance spot REST client

use crate::{
    config::ExchangeConfig,
    connectors::traits::*,
    data::{quantity_step_from_filters, AssetSymbol},
    ConvertError, Result,
};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, info};

type HmacSha256 = Hmac<Sha256>;

const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// Binance REST client
pub struct BinanceRestClient {
    base_url: String,
    api_key: String,
    secret_key: String,
    recv_window_ms: u64,
    client: reqwest::Client,
}

impl BinanceRestClient {
    /// Create a new client from the exchange configuration
    pub fn new(config: &ExchangeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConvertError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.rest_api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            secret_key: config.secret_key.clone(),
            recv_window_ms: config.recv_window_ms,
            client,
        })
    }

    /// HMAC-SHA256 signature of a query string, hex encoded
    pub fn sign(&self, payload: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| ConvertError::Config(format!("Invalid secret key: {}", e)))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Build a signed query string from request parameters
    fn signed_query(&self, params: &[(&str, String)]) -> Result<String> {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in params {
            query.append_pair(key, value);
        }
        query.append_pair("recvWindow", &self.recv_window_ms.to_string());
        query.append_pair("timestamp", &chrono::Utc::now().timestamp_millis().to_string());
        let payload = query.finish();

        let signature = self.sign(&payload)?;
        Ok(format!("{}&signature={}", payload, signature))
    }

    /// Map non-success responses to exchange errors
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ConvertError::Exchange {
            status: status.as_u16(),
            body,
        }
        .into())
    }

    /// Parse an `exchangeInfo` body into tradable symbols
    pub fn parse_exchange_info(body: &str) -> Result<Vec<AssetSymbol>> {
        let info: BinanceExchangeInfo = serde_json::from_str(body)
            .map_err(|e| ConvertError::DataParsing(format!("Failed to parse exchange info: {}", e)))?;

        let total = info.symbols.len();
        let symbols: Vec<AssetSymbol> = info
            .symbols
            .into_iter()
            .filter(|s| s.status == "TRADING")
            .map(|s| AssetSymbol {
                quantity_step: quantity_step_from_filters(&s.symbol, &s.filters),
                symbol: s.symbol,
                base_asset: s.base_asset.to_uppercase(),
                quote_asset: s.quote_asset.to_uppercase(),
            })
            .collect();

        debug!("{} of {} symbols are trading", symbols.len(), total);
        Ok(symbols)
    }
}

#[async_trait]
impl MetadataSource for BinanceRestClient {
    async fn fetch_symbols(&self) -> Result<Vec<AssetSymbol>> {
        let url = format!("{}/api/v3/exchangeInfo", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ConvertError::Connection(format!("HTTP request failed: {}", e)))?;
        let response = Self::check_status(response).await?;

        let body = response
            .text()
            .await
            .map_err(|e| ConvertError::Connection(format!("Failed to read exchange info: {}", e)))?;

        Self::parse_exchange_info(&body)
    }
}

#[async_trait]
impl OrderGateway for BinanceRestClient {
    async fn submit_market_order(&self, order: &MarketOrder) -> Result<OrderReceipt> {
        let client_order_id = format!("ac-{}", uuid::Uuid::new_v4().simple());
        let params = [
            ("symbol", order.symbol.clone()),
            ("side", order.side.to_string()),
            ("type", "MARKET".to_string()),
            (order.quantity.param_name(), order.formatted_quantity()),
            ("newOrderRespType", "RESULT".to_string()),
            ("newClientOrderId", client_order_id.clone()),
        ];
        let query = self.signed_query(&params)?;
        let url = format!("{}/api/v3/order?{}", self.base_url, query);

        debug!(
            symbol = %order.symbol,
            side = %order.side,
            client_order_id = %client_order_id,
            "Submitting market order"
        );

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| ConvertError::Connection(format!("Order request failed: {}", e)))?;
        let response = Self::check_status(response).await?;

        let result: BinanceOrderResponse = response
            .json()
            .await
            .map_err(|e| ConvertError::DataParsing(format!("Failed to parse order response: {}", e)))?;

        Ok(OrderReceipt {
            symbol: result.symbol,
            side: result.side,
            executed_qty: result.executed_qty,
            cummulative_quote_qty: result.cummulative_quote_qty,
        })
    }
}

#[async_trait]
impl UserStreamSession for BinanceRestClient {
    async fn start_user_stream(&self) -> Result<String> {
        let url = format!("{}/api/v3/userDataStream", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| ConvertError::Connection(format!("Listen key request failed: {}", e)))?;
        let response = Self::check_status(response).await?;

        let key: BinanceListenKey = response
            .json()
            .await
            .map_err(|e| ConvertError::DataParsing(format!("Failed to parse listen key: {}", e)))?;

        info!("User data stream session started");
        Ok(key.listen_key)
    }

    async fn keepalive_user_stream(&self, listen_key: &str) -> Result<()> {
        let url = format!("{}/api/v3/userDataStream", self.base_url);

        let response = self
            .client
            .put(&url)
            .query(&[("listenKey", listen_key)])
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| ConvertError::Connection(format!("Keep-alive request failed: {}", e)))?;
        Self::check_status(response).await?;

        Ok(())
    }
}

// Binance API response types
#[derive(Debug, Deserialize)]
struct BinanceExchangeInfo {
    symbols: Vec<BinanceSymbol>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceSymbol {
    symbol: String,
    status: String,
    base_asset: String,
    quote_asset: String,
    #[serde(default)]
    filters: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct BinanceOrderResponse {
    symbol: String,
    side: OrderSide,
    #[serde(rename = "executedQty", default)]
    executed_qty: String,
    #[serde(rename = "cummulativeQuoteQty", default)]
    cummulative_quote_qty: String,
}

#[derive(Debug, Deserialize)]
struct BinanceListenKey {
    #[serde(rename = "listenKey")]
    listen_key: String,
}
