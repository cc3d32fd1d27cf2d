use autoconvert::{config::TelegramConfig, connectors::TelegramSink, Notifier};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> TelegramConfig {
    TelegramConfig {
        api_url: server.uri(),
        bot_token: Some("123:abc".to_string()),
        chat_id: Some(42),
    }
}

#[tokio::test]
async fn test_notifier_messages_reach_telegram() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .and(body_json(json!({"chat_id": 42, "text": "Bot started"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .and(body_json(json!({"chat_id": 42, "text": "executed ETHUSDT SELL 100"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let (notifier, messages) = Notifier::channel();
    let sink = TelegramSink::new(&config_for(&server)).unwrap();
    assert!(sink.is_enabled());
    let task = sink.spawn(messages);

    notifier.notify("Bot started");
    notifier.notify(format!("executed {} {} {}", "ETHUSDT", "SELL", 100.0));
    drop(notifier);

    // The sink finishes once every handle is gone
    task.await.unwrap();
}

#[tokio::test]
async fn test_delivery_failure_does_not_stop_the_sink() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
        .expect(2)
        .mount(&server)
        .await;

    let sink = TelegramSink::new(&config_for(&server)).unwrap();
    assert!(sink.send("first").await.is_err());

    let (notifier, messages) = Notifier::channel();
    let task = sink.spawn(messages);
    notifier.notify("second");
    drop(notifier);
    task.await.unwrap();
}
