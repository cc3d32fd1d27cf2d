//! Binance user data stream: balance notifications and listen key upkeep

use crate::{
    connectors::traits::{BalanceChangeEvent, UserStreamSession},
    ConvertError, Result,
};
use futures_util::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum StreamEnd {
    Disconnected,
    ReceiverClosed,
}

/// WebSocket connection delivering account events for one listen key
pub struct UserDataStream {
    ws_base: String,
    listen_key: String,
    reconnect_delay: Duration,
}

impl UserDataStream {
    /// Create a stream for a listen key
    pub fn new(ws_base: &str, listen_key: &str, reconnect_delay: Duration) -> Self {
        Self {
            ws_base: ws_base.trim_end_matches('/').to_string(),
            listen_key: listen_key.to_string(),
            reconnect_delay,
        }
    }

    /// `{base}/ws/{listenKey}`
    pub fn stream_url(&self) -> Result<Url> {
        let raw = format!("{}/ws/{}", self.ws_base, self.listen_key);
        Url::parse(&raw)
            .map_err(|e| ConvertError::Connection(format!("Invalid WebSocket URL: {}", e)).into())
    }

    /// Open the WebSocket connection
    pub async fn connect(&self) -> Result<WsStream> {
        let url = self.stream_url()?;
        match connect_async(url).await {
            Ok((ws, _)) => {
                info!("Connected to user data stream");
                Ok(ws)
            }
            Err(e) => {
                Err(ConvertError::Connection(format!("WebSocket connection failed: {}", e)).into())
            }
        }
    }

    /// Forward balance changes until the receiver goes away, re-connecting
    /// whenever the exchange drops the connection.
    pub async fn run(self, initial: WsStream, events: mpsc::Sender<BalanceChangeEvent>) -> Result<()> {
        let mut ws = initial;
        loop {
            if let StreamEnd::ReceiverClosed = Self::pump(ws, &events).await {
                info!("Balance event receiver closed, stopping user data stream");
                return Ok(());
            }

            ws = loop {
                tokio::time::sleep(self.reconnect_delay).await;
                match self.connect().await {
                    Ok(ws) => break ws,
                    Err(e) => error!("Reconnect to user data stream failed: {}", e),
                }
            };
        }
    }

    async fn pump(mut ws: WsStream, events: &mpsc::Sender<BalanceChangeEvent>) -> StreamEnd {
        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Text(text)) => match Self::parse_event(&text) {
                    Ok(Some(event)) => {
                        if events.send(event).await.is_err() {
                            return StreamEnd::ReceiverClosed;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Discarding user data event: {}", e),
                },
                Ok(Message::Close(frame)) => {
                    warn!("User data stream closed by exchange: {:?}", frame);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("User data stream error: {}", e);
                    break;
                }
            }
        }
        StreamEnd::Disconnected
    }

    /// Decode a stream message. Only `balanceUpdate` produces an event.
    pub fn parse_event(text: &str) -> Result<Option<BalanceChangeEvent>> {
        let event: BinanceUserEvent = serde_json::from_str(text)
            .map_err(|e| ConvertError::DataParsing(format!("Failed to parse user event: {}", e)))?;

        if event.event_type != "balanceUpdate" {
            debug!("Ignoring {} event", event.event_type);
            return Ok(None);
        }

        let asset = event
            .asset
            .ok_or_else(|| ConvertError::DataParsing("balanceUpdate without asset".to_string()))?;
        let delta = event
            .delta
            .ok_or_else(|| ConvertError::DataParsing("balanceUpdate without delta".to_string()))?;
        let change: f64 = delta.parse().map_err(|e| {
            ConvertError::DataParsing(format!("Invalid balance delta '{}' for {}: {}", delta, asset, e))
        })?;

        Ok(Some(BalanceChangeEvent { asset, change }))
    }
}

/// Renew the listen key every `interval`; after a failure wait an extra
/// `retry_delay` before the next attempt.
pub fn spawn_keepalive(
    session: Arc<dyn UserStreamSession>,
    listen_key: String,
    interval: Duration,
    retry_delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            info!("Pinging user data stream");
            if let Err(e) = session.keepalive_user_stream(&listen_key).await {
                error!("Listen key keep-alive failed: {}", e);
                tokio::time::sleep(retry_delay).await;
            }
        }
    })
}

#[derive(Debug, Deserialize)]
struct BinanceUserEvent {
    #[serde(rename = "e")]
    event_type: String,
    #[serde(rename = "a")]
    asset: Option<String>,
    #[serde(rename = "d")]
    delta: Option<String>,
}
