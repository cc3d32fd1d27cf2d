use super::{RecordingGateway, Reply, TestUtils};
use autoconvert::{
    connectors::BalanceChangeEvent, BalanceEventHandler, ConversionRules, Notifier,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_test::assert_err;

#[tokio::test]
async fn test_balance_update_converts_into_every_target() {
    let gateway = Arc::new(
        RecordingGateway::new()
            // Two ETHUSDT orders: the direct USDT target and the XRP bridge leg
            .reply("ETHUSDT", Reply::fill("1.0000", "100.00"))
            .reply("ETHUSDT", Reply::fill("1.0000", "100.00"))
            .reply("XRPUSDT", Reply::fill("200", "100.00")),
    );
    let rules = ConversionRules::default().with_rule("ETH", &[("XRP", 50.0), ("USDT", 50.0)]);
    let (notifier, mut messages) = Notifier::channel();

    let (job_tx, job_rx) = mpsc::channel(4);
    let (event_tx, event_rx) = mpsc::channel(4);

    let dispatcher =
        TestUtils::create_dispatcher(TestUtils::create_test_catalog(), gateway.clone(), notifier.clone());
    let dispatcher_task = tokio::spawn(dispatcher.run(job_rx));
    let handler_task =
        tokio::spawn(BalanceEventHandler::new(Arc::new(rules), job_tx, notifier).run(event_rx));

    event_tx.send(BalanceChangeEvent::new("ETH", 2.0)).await.unwrap();
    event_tx.send(BalanceChangeEvent::new("ETH", -2.0)).await.unwrap();
    event_tx.send(BalanceChangeEvent::new("BNB", 1.0)).await.unwrap();
    drop(event_tx);

    handler_task.await.unwrap().unwrap();
    let stats = tokio::time::timeout(Duration::from_secs(10), dispatcher_task)
        .await
        .expect("dispatcher did not stop")
        .unwrap();

    assert_eq!(stats.processed, 4);
    assert_eq!(stats.rerouted, 1);
    assert_eq!(stats.settled, 3);
    assert_eq!(stats.failed, 0);

    let orders = gateway.orders();
    assert_eq!(TestUtils::orders_on(&orders, "ETHUSDT").len(), 2);
    assert_eq!(
        TestUtils::orders_on(&orders, "XRPUSDT"),
        vec![TestUtils::buy("XRPUSDT", 100.0, 0)]
    );

    let mut sent = Vec::new();
    while let Ok(message) = messages.try_recv() {
        sent.push(message);
    }
    let position = |text: &str| sent.iter().position(|m| m == text);
    assert_eq!(position("balance updated: 2 ETH"), Some(0));
    let to_xrp = position("trading 50% of ETH to XRP").unwrap();
    let to_usdt = position("trading 50% of ETH to USDT").unwrap();
    assert!(to_xrp < to_usdt);
    assert!(position("executed XRPUSDT BUY 200").is_some());
    assert!(!sent.iter().any(|m| m.contains("BNB")));
}

#[tokio::test]
async fn test_handler_stops_when_dispatcher_is_gone() {
    let rules = ConversionRules::default().with_rule("ETH", &[("USDT", 100.0)]);
    let (job_tx, job_rx) = mpsc::channel(1);
    drop(job_rx);

    let (event_tx, event_rx) = mpsc::channel(1);
    event_tx.send(BalanceChangeEvent::new("ETH", 1.0)).await.unwrap();

    assert_err!(
        BalanceEventHandler::new(Arc::new(rules), job_tx, Notifier::disabled())
            .run(event_rx)
            .await
    );
}
