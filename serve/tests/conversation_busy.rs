//! Invariant 6 (spec §8): at-most-one-in-flight turn per `(user, conversationId)`.

mod common;

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use common::{seed_provider_and_model, sse_completion_body, TestServer};

#[tokio::test]
async fn concurrent_retries_on_the_same_conversation_conflict() {
    let server = TestServer::spawn().await;
    let user = "bob";
    let model = seed_provider_and_model(&server, user, "gpt-4o").await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_raw(sse_completion_body("hello"), "text/event-stream"),
        )
        .mount(&server.mock_provider)
        .await;

    // Seed a conversation with one finished turn (message 1 = user, 2 = assistant).
    server
        .client
        .post(server.url("/api/chat/stream"))
        .header("x-user-id", user)
        .json(&serde_json::json!({
            "conversationId": null,
            "parentId": 0,
            "model": model,
            "content": "first",
        }))
        .send()
        .await
        .unwrap();

    let conversations: serde_json::Value = server
        .client
        .get(server.url("/api/conversations"))
        .header("x-user-id", user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let conv_id = conversations[0]["id"].as_str().unwrap().to_string();

    // Now delay the provider so both concurrent retries are genuinely in flight
    // at the same time instead of racing to completion before either observes
    // the other's lock.
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_delay(Duration::from_millis(300))
                .set_body_raw(sse_completion_body("hello again"), "text/event-stream"),
        )
        .mount(&server.mock_provider)
        .await;

    let body = serde_json::json!({ "conversationId": conv_id, "parentId": 1, "model": model });
    let url = server.url("/api/chat/retry");

    let send = |client: reqwest::Client, url: String, body: serde_json::Value, user: String| {
        tokio::spawn(async move {
            client
                .post(url)
                .header("x-user-id", user)
                .json(&body)
                .send()
                .await
        })
    };

    let (res_a, res_b) = tokio::join!(
        send(server.client.clone(), url.clone(), body.clone(), user.to_string()),
        send(server.client.clone(), url, body, user.to_string()),
    );

    let status_a = res_a.unwrap().unwrap().status().as_u16();
    let status_b = res_b.unwrap().unwrap().status().as_u16();

    assert!(
        [status_a, status_b].contains(&409),
        "expected one of the two concurrent retries to be rejected as Conflict, got ({status_a}, {status_b})"
    );

    server.shutdown().await;
}
