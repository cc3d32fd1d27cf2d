use autoconvert::{
    config::ExchangeConfig,
    connectors::{MarketOrder, OrderGateway, OrderQuantity, OrderSide, UserStreamSession},
    data::Orientation,
    BinanceRestClient, ConvertError, SymbolCatalog,
};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> BinanceRestClient {
    let config = ExchangeConfig {
        rest_api_url: server.uri(),
        api_key: "test_key".to_string(),
        secret_key: "test_secret".to_string(),
        ..ExchangeConfig::default()
    };
    BinanceRestClient::new(&config).unwrap()
}

fn exchange_info() -> serde_json::Value {
    json!({
        "timezone": "UTC",
        "symbols": [
            {
                "symbol": "ETHUSDT", "status": "TRADING", "baseAsset": "ETH", "quoteAsset": "USDT",
                "filters": [
                    {"filterType": "PRICE_FILTER", "tickSize": "0.01000000"},
                    {"filterType": "LOT_SIZE", "minQty": "0.00010000", "stepSize": "0.00010000"}
                ]
            },
            {
                "symbol": "XRPUSDT", "status": "TRADING", "baseAsset": "XRP", "quoteAsset": "USDT",
                "filters": [{"filterType": "LOT_SIZE", "stepSize": "1.00000000"}]
            },
            {
                "symbol": "LUNAUSDT", "status": "HALT", "baseAsset": "LUNA", "quoteAsset": "USDT",
                "filters": []
            }
        ]
    })
}

#[tokio::test]
async fn test_catalog_loads_from_exchange_info() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/exchangeInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(exchange_info()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let catalog = SymbolCatalog::load(&client).await.unwrap();

    assert_eq!(catalog.len(), 2);
    let pair = catalog.lookup("usdt", "eth").unwrap();
    assert_eq!(pair.symbol.symbol, "ETHUSDT");
    assert_eq!(pair.orientation, Orientation::Reverse);
    assert_eq!(catalog.precision_of(pair.symbol), 4);
    assert!(catalog.lookup("LUNA", "USDT").is_none());
}

#[tokio::test]
async fn test_catalog_load_fails_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/exchangeInfo"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = SymbolCatalog::load(&client).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<ConvertError>(), Some(ConvertError::Metadata(_))));
}

#[tokio::test]
async fn test_market_sell_is_signed_and_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/order"))
        .and(header("X-MBX-APIKEY", "test_key"))
        .and(query_param("symbol", "ETHUSDT"))
        .and(query_param("side", "SELL"))
        .and(query_param("type", "MARKET"))
        .and(query_param("quantity", "1.5000"))
        .and(query_param("newOrderRespType", "RESULT"))
        .and(query_param("recvWindow", "5000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "symbol": "ETHUSDT",
            "orderId": 28,
            "clientOrderId": "ac-test",
            "transactTime": 1507725176595u64,
            "price": "0.00000000",
            "origQty": "1.50000000",
            "executedQty": "1.50000000",
            "cummulativeQuoteQty": "3750.75000000",
            "status": "FILLED",
            "type": "MARKET",
            "side": "SELL"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let order = MarketOrder {
        symbol: "ETHUSDT".to_string(),
        side: OrderSide::Sell,
        quantity: OrderQuantity::Base(1.5),
        precision: 4,
    };
    let receipt = client.submit_market_order(&order).await.unwrap();

    assert_eq!(receipt.side, OrderSide::Sell);
    assert_eq!(receipt.proceeds().unwrap(), 3750.75);

    let requests = server.received_requests().await.unwrap();
    let query = requests[0].url.query().unwrap_or_default().to_string();
    assert!(query.contains("signature="));
    assert!(query.contains("timestamp="));
    assert!(query.contains("newClientOrderId=ac-"));
}

#[tokio::test]
async fn test_market_buy_spends_quote_quantity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/order"))
        .and(query_param("side", "BUY"))
        .and(query_param("quoteOrderQty", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "symbol": "XRPUSDT",
            "side": "BUY",
            "executedQty": "199.00000000",
            "cummulativeQuoteQty": "99.50000000"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let order = MarketOrder {
        symbol: "XRPUSDT".to_string(),
        side: OrderSide::Buy,
        quantity: OrderQuantity::Quote(100.0),
        precision: 0,
    };
    let receipt = client.submit_market_order(&order).await.unwrap();
    assert_eq!(receipt.proceeds().unwrap(), 199.0);
}

#[tokio::test]
async fn test_rejected_order_surfaces_exchange_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/order"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string(r#"{"code":-2010,"msg":"Account has insufficient balance for requested action."}"#),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let order = MarketOrder {
        symbol: "ETHUSDT".to_string(),
        side: OrderSide::Sell,
        quantity: OrderQuantity::Base(1.0),
        precision: 4,
    };
    let err = client.submit_market_order(&order).await.unwrap_err();

    match err.downcast_ref::<ConvertError>() {
        Some(ConvertError::Exchange { status, body }) => {
            assert_eq!(*status, 400);
            assert!(body.contains("-2010"));
        }
        other => panic!("expected exchange error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_listen_key_lifecycle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/userDataStream"))
        .and(header("X-MBX-APIKEY", "test_key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"listenKey": "pqia91ma19a5s61cv6a81va65sdf19v8a65a1a5s61cv6a81va65sdf19v8a65a1"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v3/userDataStream"))
        .and(query_param(
            "listenKey",
            "pqia91ma19a5s61cv6a81va65sdf19v8a65a1a5s61cv6a81va65sdf19v8a65a1",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let key = client.start_user_stream().await.unwrap();
    assert_eq!(key, "pqia91ma19a5s61cv6a81va65sdf19v8a65a1a5s61cv6a81va65sdf19v8a65a1");
    assert_ok!(client.keepalive_user_stream(&key).await);
}

#[tokio::test]
async fn test_keepalive_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v3/userDataStream"))
        .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"code":-1125,"msg":"This listenKey does not exist."}"#))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_err!(client.keepalive_user_stream("expired").await);
}
