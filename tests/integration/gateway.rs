//! HTTP gateway over a real socket.

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use voxtask::VoiceAssistant;
use voxtask::tasks::TaskStore;
use voxtask::server::{USER_HEADER, router, serve_on};

use crate::helpers::{Harness, OWNER};

struct RunningGateway {
    base: String,
    cancel: CancellationToken,
    client: reqwest::Client,
}

impl Drop for RunningGateway {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn start(assistant: Arc<VoiceAssistant>, bearer: Option<&str>) -> RunningGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let cancel = CancellationToken::new();
    let app = router(assistant, bearer.map(str::to_owned));
    tokio::spawn(serve_on(listener, app, cancel.clone()));
    RunningGateway {
        base,
        cancel,
        client: reqwest::Client::new(),
    }
}

#[tokio::test]
async fn health_is_open() {
    let h = Harness::in_memory();
    let gw = start(h.assistant.clone(), Some("secret")).await;
    let resp = gw.client.get(format!("{}/health", gw.base)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn voice_command_creates_task() {
    let h = Harness::in_memory();
    h.completion
        .push(r#"{"action":"create","task":{"title":"Buy milk","dueDate":"2025-06-02T17:00:00Z"}}"#);
    let gw = start(h.assistant.clone(), None).await;

    let resp = gw
        .client
        .post(format!("{}/api/voice/command", gw.base))
        .header(USER_HEADER, OWNER)
        .json(&json!({"command": "add buy milk tomorrow at 5pm"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["action"], "create");
    assert_eq!(body["task"]["title"], "Buy milk");
    assert_eq!(body["task"]["dueDate"], "2025-06-02T17:00:00Z");

    let resp = gw
        .client
        .get(format!("{}/api/tasks", gw.base))
        .header(USER_HEADER, OWNER)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["tasks"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn voice_failure_is_still_200_with_spoken_reply() {
    let h = Harness::in_memory();
    h.completion.push("nonsense");
    let gw = start(h.assistant.clone(), None).await;

    let resp = gw
        .client
        .post(format!("{}/api/voice/command", gw.base))
        .header(USER_HEADER, OWNER)
        .json(&json!({"command": "do the thing"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "INTERPRETATION_FAILED");
    assert_eq!(body["response"], "Sorry, I couldn't process that command");
}

#[tokio::test]
async fn unreadable_voice_body_still_gets_spoken_reply() {
    let h = Harness::in_memory();
    let gw = start(h.assistant.clone(), None).await;
    let url = format!("{}/api/voice/command", gw.base);

    let malformed = gw
        .client
        .post(&url)
        .header(USER_HEADER, OWNER)
        .header("content-type", "application/json")
        .body("{\"command\": ")
        .send()
        .await
        .unwrap();
    let untyped = gw
        .client
        .post(&url)
        .header(USER_HEADER, OWNER)
        .body("add buy milk")
        .send()
        .await
        .unwrap();

    for resp in [malformed, untyped] {
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
        assert!(!body["response"].as_str().unwrap().is_empty());
    }
    assert!(h.store.find_by_owner(OWNER).await.unwrap().is_empty());
}

#[tokio::test]
async fn bearer_and_user_header_are_required() {
    let h = Harness::in_memory();
    let gw = start(h.assistant.clone(), Some("secret")).await;
    let url = format!("{}/api/tasks", gw.base);

    let resp = gw.client.get(&url).header(USER_HEADER, OWNER).send().await.unwrap();
    assert_eq!(resp.status(), 401);

    let resp = gw.client.get(&url).bearer_auth("secret").send().await.unwrap();
    assert_eq!(resp.status(), 401);

    let resp = gw
        .client
        .get(&url)
        .bearer_auth("secret")
        .header(USER_HEADER, OWNER)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn report_endpoint_maps_errors_to_status() {
    let h = Harness::in_memory();
    let gw = start(h.assistant.clone(), None).await;
    let url = format!("{}/api/tasks/report", gw.base);

    let resp = gw.client.post(&url).header(USER_HEADER, OWNER).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(h.email.sent().len(), 1);

    h.email.set_failing(true);
    let resp = gw.client.post(&url).header(USER_HEADER, OWNER).send().await.unwrap();
    assert_eq!(resp.status(), 502);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "DELIVERY_FAILED");

    let resp = gw
        .client
        .post(&url)
        .header(USER_HEADER, "stranger")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
