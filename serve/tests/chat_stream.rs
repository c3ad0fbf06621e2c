//! S1 (spec §8): fresh conversation, single turn, no tools.

mod common;

use futures::StreamExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use common::{seed_provider_and_model, sse_completion_body, TestServer};

#[tokio::test]
async fn fresh_conversation_single_turn_streams_metadata_then_content_then_complete() {
    let server = TestServer::spawn().await;
    let user = "alice";
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

    let response = server
        .client
        .post(server.url("/api/chat/stream"))
        .header("x-user-id", user)
        .json(&serde_json::json!({
            "conversationId": null,
            "parentId": 0,
            "model": model,
            "content": "hi",
        }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );

    let mut body = String::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        body.push_str(&String::from_utf8_lossy(&chunk.unwrap()));
        if body.contains("\"complete\"") || body.contains("event: error") {
            break;
        }
    }

    assert!(body.contains("metadata"), "expected a metadata chunk, got: {body}");
    assert!(body.contains("userMessageId"), "expected userMessageId in metadata: {body}");
    assert!(body.contains("content"), "expected a content chunk: {body}");
    assert!(body.contains("complete"), "expected a terminal complete chunk: {body}");

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
    let conversations = conversations.as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    let conv_id = conversations[0]["id"].as_str().unwrap();

    let messages: serde_json::Value = server
        .client
        .get(server.url(&format!("/api/conversations/{conv_id}/messages")))
        .header("x-user-id", user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let messages = messages.as_array().unwrap();
    assert_eq!(messages.len(), 2, "expected a user message and an assistant message");
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["parentId"], messages[0]["id"]);

    server.shutdown().await;
}
