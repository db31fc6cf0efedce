//! HTTP contract tests for the completion, email and WhatsApp clients.

use std::sync::Arc;

use serde_json::json;
use voxtask::config::{CompletionConfig, EmailConfig, WhatsAppConfig};
use voxtask::llm::{CompletionClient, GeminiClient, with_failover};
use voxtask::notify::{EmailChannel, Notification, NotificationChannel, Recipient, WhatsAppChannel};
use voxtask::users::{CredentialSelector, CredentialSlot, MemoryUserDirectory};
use wiremock::matchers::{bearer_token, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gemini(server: &MockServer) -> GeminiClient {
    GeminiClient::new(&CompletionConfig {
        base_url: server.uri(),
        model: "gemini-test".into(),
        timeout_secs: 5,
    })
    .unwrap()
}

fn candidate(text: &str) -> serde_json::Value {
    json!({"candidates": [{"content": {"parts": [{"text": text}], "role": "model"}}]})
}

fn note() -> Notification {
    Notification {
        subject: "Reminder: Buy milk".into(),
        text: "Hi Ada, this is your reminder for \"Buy milk\".".into(),
        html: "<p>Hi Ada</p>".into(),
    }
}

#[tokio::test]
async fn gemini_request_shape_and_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-test:generateContent"))
        .and(header("x-goog-api-key", "key-a"))
        .and(body_partial_json(json!({
            "contents": [{"parts": [{"text": "hello"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate("{\"action\":\"list\"}")))
        .expect(1)
        .mount(&server)
        .await;

    let text = gemini(&server).complete("key-a", "hello").await.unwrap();
    assert_eq!(text, "{\"action\":\"list\"}");
}

#[tokio::test]
async fn gemini_error_statuses_are_classified() {
    let server = MockServer::start().await;
    Mock::given(header("x-goog-api-key", "revoked"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"error": {"message": "denied"}})),
        )
        .mount(&server)
        .await;
    Mock::given(header("x-goog-api-key", "typo"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "API key not valid.", "details": [{"reason": "API_KEY_INVALID"}]}
        })))
        .mount(&server)
        .await;
    Mock::given(header("x-goog-api-key", "busy"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let client = gemini(&server);
    assert!(client.complete("revoked", "x").await.unwrap_err().is_credential());
    assert!(client.complete("typo", "x").await.unwrap_err().is_credential());
    let err = client.complete("busy", "x").await.unwrap_err();
    assert_eq!(err.code(), "COMPLETION_FAILED");
}

#[tokio::test]
async fn gemini_failover_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(header("x-goog-api-key", "key-a"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(header("x-goog-api-key", "key-b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let profile = crate::helpers::profile();
    let directory = Arc::new(MemoryUserDirectory::new([profile.clone()]));
    let selector = CredentialSelector::new(&profile, directory);
    let client = gemini(&server);

    let text = with_failover(&selector, |key| {
        let client = client.clone();
        async move { client.complete(&key, "ping").await }
    })
    .await
    .unwrap();
    assert_eq!(text, "ok");
    assert_eq!(selector.active_slot(), CredentialSlot::Secondary);
}

#[tokio::test]
async fn email_posts_to_emails_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(bearer_token("re_test"))
        .and(body_partial_json(json!({
            "from": "Voxtask <reminders@voxtask.local>",
            "to": ["ada@example.com"],
            "subject": "Reminder: Buy milk",
            "html": "<p>Hi Ada</p>"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "em_1"})))
        .expect(1)
        .mount(&server)
        .await;

    let channel = EmailChannel::new(&EmailConfig {
        api_url: server.uri(),
        api_key: "re_test".into(),
        ..EmailConfig::default()
    })
    .unwrap();
    assert!(channel.send(&Recipient::email("ada@example.com"), &note()).await);
}

#[tokio::test]
async fn email_provider_error_is_not_delivered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(422).set_body_string("invalid from"))
        .mount(&server)
        .await;

    let channel = EmailChannel::new(&EmailConfig {
        api_url: server.uri(),
        api_key: "re_test".into(),
        ..EmailConfig::default()
    })
    .unwrap();
    let attempt = channel
        .attempt(&Recipient::email("ada@example.com"), &note())
        .await;
    assert!(!attempt.is_delivered());
    assert_eq!(attempt.channel, "email");
}

#[tokio::test]
async fn whatsapp_gateway_receives_query_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/whatsapp.php"))
        .and(query_param("phone", "+15550100"))
        .and(query_param("text", "Buy milk now"))
        .and(query_param("apikey", "wa-key"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Message queued"))
        .expect(1)
        .mount(&server)
        .await;

    let channel = WhatsAppChannel::new(&WhatsAppConfig {
        gateway_url: format!("{}/whatsapp.php", server.uri()),
    })
    .unwrap();
    assert!(channel.send_with_key("+1 555 0100", "Buy milk now", "wa-key").await);
}

#[tokio::test]
async fn whatsapp_gateway_rejection_is_not_delivered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("APIKey is invalid"))
        .mount(&server)
        .await;

    let channel = WhatsAppChannel::new(&WhatsAppConfig {
        gateway_url: format!("{}/whatsapp.php", server.uri()),
    })
    .unwrap();
    assert!(!channel.send_with_key("+15550100", "hi", "bad").await);
}
