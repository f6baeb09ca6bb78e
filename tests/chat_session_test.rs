//! Chat loop integration tests with a scripted reasoning engine
//!
//! The MCP server is a wiremock instance; the engine replays a fixed list of
//! replies and records the conversation it was shown on every round.

mod common;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use snowmcp::agent::{CapabilityInvocation, ChatSession, EngineReply, Message, ReasoningEngine};
use snowmcp::error::{Result, SnowmcpError};
use snowmcp::mcp::session::RpcSession;
use snowmcp::mcp::types::Capability;

use common::{mcp_session, rpc_error, rpc_result, tools_result};

// ---------------------------------------------------------------------------
// Scripted engine
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct ScriptedEngine {
    replies: Arc<Mutex<VecDeque<EngineReply>>>,
    seen: Arc<Mutex<Vec<(Vec<Message>, usize)>>>,
}

impl ScriptedEngine {
    fn new(replies: Vec<EngineReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn rounds(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    fn last_conversation(&self) -> Vec<Message> {
        self.seen
            .lock()
            .unwrap()
            .last()
            .map(|(messages, _)| messages.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ReasoningEngine for ScriptedEngine {
    async fn respond(
        &self,
        conversation: &[Message],
        capabilities: &[Capability],
    ) -> Result<EngineReply> {
        self.seen
            .lock()
            .unwrap()
            .push((conversation.to_vec(), capabilities.len()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| SnowmcpError::Engine("script exhausted".to_string()).into())
    }
}

fn invoke(id: &str, name: &str, arguments: serde_json::Value) -> EngineReply {
    EngineReply::Invoke(CapabilityInvocation {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    })
}

/// A session that has already discovered `names` (consuming request id 0).
async fn discovered_session(server: &MockServer, names: &[&str]) -> RpcSession {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "id": 0, "method": "tools/list" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(0, tools_result(names))))
        .mount(server)
        .await;

    let mut session = mcp_session(server);
    session.discover_capabilities().await.unwrap();
    session
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_text_reply_ends_the_turn() {
    let server = MockServer::start().await;
    let session = discovered_session(&server, &["search"]).await;
    let engine = ScriptedEngine::new(vec![EngineReply::Text("Hello!".to_string())]);

    let mut chat = ChatSession::new(Box::new(engine.clone()), session, 4).unwrap();
    let answer = chat.handle_turn("hi").await.unwrap();

    assert_eq!(answer, "Hello!");
    assert_eq!(engine.rounds(), 1);
    assert_eq!(engine.seen.lock().unwrap()[0].1, 1, "capabilities offered");
    assert_eq!(chat.conversation().len(), 2);
}

#[tokio::test]
async fn test_invocation_result_is_fed_back_to_engine() {
    let server = MockServer::start().await;
    let session = discovered_session(&server, &["search"]).await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "id": 1,
            "method": "tools/call",
            "params": { "name": "search", "arguments": { "query": "q3" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(
            1,
            json!({ "content": [{ "type": "text", "text": "Q3 revenue was 42" }] }),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let engine = ScriptedEngine::new(vec![
        invoke("call_1", "search", json!({ "query": "q3" })),
        EngineReply::Text("Revenue was 42.".to_string()),
    ]);
    let mut chat = ChatSession::new(Box::new(engine.clone()), session, 4).unwrap();

    let answer = chat.handle_turn("What was Q3 revenue?").await.unwrap();
    assert_eq!(answer, "Revenue was 42.");
    assert_eq!(engine.rounds(), 2);

    let seen = engine.last_conversation();
    let tool_msg = seen.last().unwrap();
    assert_eq!(tool_msg.role, "tool");
    assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(tool_msg.content.as_deref(), Some("Q3 revenue was 42"));
    assert_eq!(chat.session().next_id(), 2);
}

#[tokio::test]
async fn test_failed_invocation_is_a_failed_result_not_an_error() {
    let server = MockServer::start().await;
    let session = discovered_session(&server, &["search"]).await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "id": 1, "method": "tools/call" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_error(1, -32000, "boom")))
        .expect(1)
        .mount(&server)
        .await;

    let engine = ScriptedEngine::new(vec![
        invoke("call_1", "search", json!({})),
        EngineReply::Text("Sorry, the search failed.".to_string()),
    ]);
    let mut chat = ChatSession::new(Box::new(engine.clone()), session, 4).unwrap();

    let answer = chat.handle_turn("search please").await.unwrap();
    assert_eq!(answer, "Sorry, the search failed.");

    let seen = engine.last_conversation();
    let content = seen.last().unwrap().content.clone().unwrap();
    assert!(content.contains("failed"), "{content}");
    assert!(content.contains("boom"), "{content}");
    // The protocol error still completed a request/response pair.
    assert_eq!(chat.session().next_id(), 2);
}

#[tokio::test]
async fn test_unknown_capability_is_not_sent_to_server() {
    let server = MockServer::start().await;
    let session = discovered_session(&server, &["search"]).await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "tools/call" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let engine = ScriptedEngine::new(vec![
        invoke("call_1", "delete_everything", json!({})),
        EngineReply::Text("I can't do that.".to_string()),
    ]);
    let mut chat = ChatSession::new(Box::new(engine.clone()), session, 4).unwrap();

    assert_eq!(chat.handle_turn("go").await.unwrap(), "I can't do that.");
    let content = engine.last_conversation().last().unwrap().content.clone().unwrap();
    assert!(content.contains("delete_everything"));
    assert_eq!(chat.session().next_id(), 1);
}

#[tokio::test]
async fn test_too_many_invocations_fail_the_turn() {
    let server = MockServer::start().await;
    let session = discovered_session(&server, &["search"]).await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "tools/call" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(1, json!({}))))
        .mount(&server)
        .await;

    let engine = ScriptedEngine::new(vec![
        invoke("c1", "search", json!({})),
        invoke("c2", "search", json!({})),
        EngineReply::Text("never reached".to_string()),
    ]);
    let mut chat = ChatSession::new(Box::new(engine.clone()), session, 1).unwrap();

    let err = chat.handle_turn("loop").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SnowmcpError>(),
        Some(SnowmcpError::Engine(_))
    ));
    assert_eq!(engine.rounds(), 2);
}

#[tokio::test]
async fn test_engine_error_keeps_session_usable() {
    let server = MockServer::start().await;
    let session = discovered_session(&server, &["search"]).await;
    // Empty script: first turn fails.
    let engine = ScriptedEngine::new(vec![]);
    let mut chat = ChatSession::new(Box::new(engine.clone()), session, 4).unwrap();

    assert!(chat.handle_turn("first").await.is_err());

    engine
        .replies
        .lock()
        .unwrap()
        .push_back(EngineReply::Text("recovered".to_string()));
    assert_eq!(chat.handle_turn("second").await.unwrap(), "recovered");
}

#[tokio::test]
async fn test_zero_tool_rounds_is_rejected() {
    let server = MockServer::start().await;
    let result = ChatSession::new(
        Box::new(ScriptedEngine::default()),
        mcp_session(&server),
        0,
    );
    assert!(result.is_err());
}
