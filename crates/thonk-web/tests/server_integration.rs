//! Integration tests for the thonk-web server.
//!
//! These tests start a real axum server on a random port and exercise the
//! REST endpoints, with and without a relay consuming inbound messages.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use thonk::prelude::*;
use thonk_web::{WebChannel, WebConfig, spawn_web};
use tokio::sync::mpsc::Receiver;

/// Helper: spawn a test server on port 0 (random available port).
async fn spawn_test_server() -> (WebChannel, String, Receiver<InboundMessage>) {
    let channel = WebChannel::new(64, 100);
    let config = WebConfig {
        bind_addr: ([127, 0, 0, 1], 0).into(),
        ..Default::default()
    };
    let (addr, inbound) = spawn_web(channel.clone(), config).await.unwrap();
    (channel, format!("http://{addr}"), inbound)
}

async fn post_chat(base: &str, user_id: &str, name: &str, content: &str) -> reqwest::StatusCode {
    reqwest::Client::new()
        .post(format!("{base}/api/messages"))
        .json(&json!({"user_id": user_id, "name": name, "content": content}))
        .send()
        .await
        .unwrap()
        .status()
}

async fn get_json(url: String) -> Value {
    let resp = reqwest::get(url).await.unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

/// Answers every prompt instantly.
struct CannedBackend(&'static str);

impl Backend for CannedBackend {
    fn generate<'a>(&'a self, _request: &'a GenerateRequest) -> BackendFuture<'a> {
        Box::pin(async move { Ok(json!({ "response": self.0 })) })
    }
}

// ── REST Tests ───────────────────────────────────────────────────────

#[tokio::test]
async fn get_channel_returns_snapshot() {
    let (channel, base, _inbound) = spawn_test_server().await;
    channel.send(OutboundMessage::text("hello")).await.unwrap();

    let json = get_json(format!("{base}/api/channel")).await;
    let messages = json["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["body"]["content"], "hello");
    assert_eq!(json["presence"]["status"], "available");
}

#[tokio::test]
async fn get_presence_follows_status_changes() {
    let (channel, base, _inbound) = spawn_test_server().await;
    channel
        .set_status(PresenceStatus::Busy, "🐓 Choking the AI chicken 🐓")
        .await
        .unwrap();

    let json = get_json(format!("{base}/api/presence")).await;
    assert_eq!(json["status"], "busy");
    assert_eq!(json["activity"], "🐓 Choking the AI chicken 🐓");
}

#[tokio::test]
async fn post_message_queues_inbound() {
    let (channel, base, mut inbound) = spawn_test_server().await;

    assert_eq!(post_chat(&base, "1", "ada", "!ai hi").await, 202);
    assert_eq!(post_chat(&base, "2", "grace", "hello").await, 202);

    let first = inbound.try_recv().unwrap();
    assert_eq!(first.author.id.as_str(), "1");
    assert_eq!(first.content, "!ai hi");
    let second = inbound.try_recv().unwrap();
    assert_eq!(second.members, vec!["ada"]);

    assert_eq!(channel.history().len(), 2);
}

#[tokio::test]
async fn post_message_returns_503_without_consumer() {
    let (_channel, base, inbound) = spawn_test_server().await;
    drop(inbound);
    assert_eq!(post_chat(&base, "1", "ada", "!ai hi").await, 503);
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let (_channel, base, _inbound) = spawn_test_server().await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/messages"))
        .json(&json!({"content": "no author"}))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}

// ── End to end ───────────────────────────────────────────────────────

#[tokio::test]
async fn relay_answers_through_the_channel() {
    let (channel, base, mut inbound) = spawn_test_server().await;

    let relay = Arc::new(Relay::new(
        RelayConfig::default(),
        Arc::new(CannedBackend("<think>\n\n</think>Answer: hi")),
        Arc::new(channel.clone()),
    ));
    {
        let channel = channel.clone();
        tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                relay.handle_message(message, Arc::new(channel.clone())).await;
            }
        });
    }

    assert_eq!(post_chat(&base, "1", "ada", "!ai hello").await, 202);

    let mut answer = None;
    for _ in 0..50 {
        let json = get_json(format!("{base}/api/channel")).await;
        answer = json["messages"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|m| m["body"]["description"].as_str())
            .find(|d| d.starts_with("Q: \"hello\""))
            .map(str::to_string);
        if answer.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(answer.as_deref(), Some("Q: \"hello\"\nA: # [Answer] hi"));

    // Loading indicator is gone and the relay is available again.
    let json = get_json(format!("{base}/api/channel")).await;
    let titles: Vec<&str> = json["messages"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|m| m["body"]["title"].as_str())
        .collect();
    assert!(!titles.contains(&"Processing your question..."));
    assert_eq!(json["presence"]["status"], "available");
}
