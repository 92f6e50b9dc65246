//! HTTP surface for the bug assistant.
//!
//! Axum router with thin handlers that delegate to directly-testable inner
//! functions. Only the endpoint belonging to the configured session lifecycle
//! variant is mounted, so the two variants are never active in one deployment:
//!
//! - `POST /interact/` (persistent sessions) — the client manages the session
//!   id and the session is reused across turns.
//! - `POST /chat/` (per-request sessions) — a fresh session is created per
//!   request and folded into memory after the turn.
//!
//! Errors surface as JSON: 400 for malformed JSON or missing fields, 500 with
//! the error chain for internal failures.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{error, info, instrument, warn};

use crate::{
    base::{
        config::SessionLifecycle,
        types::{Err, SessionKey, Void},
    },
    interaction::turn,
    runtime::Runtime,
};

// Request DTOs.

/// Body of `POST /interact/`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractRequest {
    pub app_name: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub new_message: Option<NewMessage>,
}

#[derive(Debug, Deserialize)]
pub struct NewMessage {
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
pub struct MessagePart {
    #[serde(default)]
    pub text: Option<String>,
}

/// Body of `POST /chat/`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
}

// Router and server.

/// Build the router for the configured lifecycle variant.
pub fn build_router(runtime: Runtime) -> Router {
    let router = match runtime.config.session_lifecycle {
        SessionLifecycle::Persistent => Router::new().route("/interact/", post(interact_handler)),
        SessionLifecycle::PerRequest => Router::new().route("/chat/", post(chat_handler)),
    };

    router.with_state(runtime)
}

/// Bind the listener and serve until interrupted.
pub async fn serve(runtime: Runtime) -> Void {
    let addr = format!("{}:{}", runtime.config.http_host, runtime.config.http_port);
    let app = build_router(runtime);
    let listener = TcpListener::bind(&addr).await?;

    info!("Bug assistant listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down ...");
        })
        .await?;

    Ok(())
}

// Inner (directly testable) functions.

/// Inner handler for the persistent-session variant.
pub async fn interact_inner(runtime: &Runtime, req: InteractRequest) -> (StatusCode, Value) {
    let (Some(app_name), Some(user_id), Some(session_id), Some(new_message)) = (req.app_name, req.user_id, req.session_id, req.new_message) else {
        return (StatusCode::BAD_REQUEST, serde_json::json!({ "error": "Invalid payload structure." }));
    };

    if new_message.parts.is_empty() {
        return (StatusCode::BAD_REQUEST, serde_json::json!({ "error": "Invalid payload structure." }));
    }

    let user_query = new_message.parts.into_iter().next().and_then(|p| p.text).filter(|t| !t.is_empty());

    let Some(user_query) = user_query else {
        return (StatusCode::BAD_REQUEST, serde_json::json!({ "error": "No message provided" }));
    };

    let key = SessionKey::new(app_name, user_id, session_id);

    match turn::run_turn(&runtime.sessions, &runtime.agent, &key, &user_query).await {
        Ok(reply) => (
            StatusCode::OK,
            serde_json::json!({
                "content": {
                    "parts": [{ "text": reply.trim() }],
                    "role": "model",
                },
                "timestamp": unix_now(),
            }),
        ),
        Err(err) => internal_error(err),
    }
}

/// Inner handler for the per-request-session variant.
pub async fn chat_inner(runtime: &Runtime, req: ChatRequest) -> (StatusCode, Value) {
    let Some(message) = req.message.filter(|m| !m.trim().is_empty()) else {
        return (StatusCode::BAD_REQUEST, serde_json::json!({ "error": "No message provided" }));
    };

    // A fresh session per request, folded into memory once the turn completes.
    let key = SessionKey::new(
        runtime.config.app_name.clone(),
        runtime.config.demo_user_id.clone(),
        uuid::Uuid::new_v4().to_string(),
    );

    let reply = match turn::run_turn(&runtime.sessions, &runtime.agent, &key, &message).await {
        Ok(reply) => reply,
        Err(err) => return internal_error(err),
    };

    if let Err(err) = turn::commit_to_memory(&runtime.sessions, &runtime.memory, &key).await {
        return internal_error(err);
    }

    (StatusCode::OK, serde_json::json!({ "reply": reply.trim() }))
}

// Axum handler wrappers (thin; delegate to inner functions).

#[instrument(skip_all)]
pub async fn interact_handler(State(runtime): State<Runtime>, payload: Result<Json<InteractRequest>, JsonRejection>) -> impl IntoResponse {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!("Rejected request body: {rejection}");
            return (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": "Invalid JSON in request" })));
        }
    };

    let (status, body) = interact_inner(&runtime, req).await;

    (status, Json(body))
}

#[instrument(skip_all)]
pub async fn chat_handler(State(runtime): State<Runtime>, payload: Result<Json<ChatRequest>, JsonRejection>) -> impl IntoResponse {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!("Rejected request body: {rejection}");
            return (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": "Invalid JSON in request" })));
        }
    };

    let (status, body) = chat_inner(&runtime, req).await;

    (status, Json(body))
}

// Helpers.

/// Current unix time in fractional seconds.
fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Convert an internal failure into a 500 payload.
///
/// The error chain is surfaced directly to the caller in `traceback`; this
/// mirrors the observed behavior and is an operational risk, not a feature.
fn internal_error(err: Err) -> (StatusCode, Value) {
    error!("Error while handling turn: {err:?}");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        serde_json::json!({
            "error": err.to_string(),
            "traceback": format!("{err:?}"),
        }),
    )
}

// Tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::{
        base::{
            config::{Config, ConfigInner},
            types::{AgentEvent, Res, Session},
        },
        service::{
            agent::{AgentClient, EventStream, GenericAgentClient},
            memory::MemoryStore,
            session::SessionStore,
        },
    };

    struct StubAgent {
        events: Vec<AgentEvent>,
    }

    #[async_trait]
    impl GenericAgentClient for StubAgent {
        async fn run_turn(&self, _session: &Session, _user_message: &str) -> Res<EventStream> {
            let events = self.events.clone().into_iter().map(Ok).collect::<Vec<_>>();

            Ok(Box::pin(futures::stream::iter(events)))
        }
    }

    async fn test_runtime(lifecycle: SessionLifecycle, events: Vec<AgentEvent>) -> Runtime {
        let config = Config {
            inner: Arc::new(ConfigInner {
                openai_api_key: "test_key".to_string(),
                app_name: "bug-assistant".to_string(),
                demo_user_id: "demo_user".to_string(),
                session_lifecycle: lifecycle,
                ..Default::default()
            }),
        };

        Runtime {
            config,
            sessions: SessionStore::surreal_memory().await.unwrap(),
            memory: MemoryStore::surreal_memory().await.unwrap(),
            agent: AgentClient::new(Arc::new(StubAgent { events })),
        }
    }

    #[tokio::test]
    async fn test_interact_inner_missing_fields_is_400_and_creates_no_session() {
        let runtime = test_runtime(SessionLifecycle::Persistent, vec![]).await;

        let req = InteractRequest {
            app_name: Some("app".to_string()),
            user_id: Some("u1".to_string()),
            session_id: Some("s1".to_string()),
            new_message: None,
        };

        let (status, body) = interact_inner(&runtime, req).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid payload structure.");

        let key = SessionKey::new("app", "u1", "s1");
        assert!(runtime.sessions.get_session(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_interact_inner_empty_text_is_400() {
        let runtime = test_runtime(SessionLifecycle::Persistent, vec![]).await;

        let req = InteractRequest {
            app_name: Some("app".to_string()),
            user_id: Some("u1".to_string()),
            session_id: Some("s1".to_string()),
            new_message: Some(NewMessage {
                parts: vec![MessagePart { text: Some(String::new()) }],
            }),
        };

        let (status, body) = interact_inner(&runtime, req).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No message provided");
    }

    #[tokio::test]
    async fn test_interact_inner_returns_model_content() {
        let runtime = test_runtime(SessionLifecycle::Persistent, vec![AgentEvent::final_response("  triaged!  ")]).await;

        let req = InteractRequest {
            app_name: Some("app".to_string()),
            user_id: Some("u1".to_string()),
            session_id: Some("s1".to_string()),
            new_message: Some(NewMessage {
                parts: vec![MessagePart {
                    text: Some("I found a bug".to_string()),
                }],
            }),
        };

        let (status, body) = interact_inner(&runtime, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["content"]["role"], "model");
        assert_eq!(body["content"]["parts"][0]["text"], "triaged!");
        assert!(body["timestamp"].is_number());
    }

    #[tokio::test]
    async fn test_chat_inner_commits_memory() {
        let runtime = test_runtime(SessionLifecycle::PerRequest, vec![AgentEvent::final_response("done")]).await;

        let req = ChatRequest {
            message: Some("hello".to_string()),
        };

        let (status, body) = chat_inner(&runtime, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"], "done");

        let records = runtime.memory.get_user_memory("demo_user").await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_chat_inner_missing_message_is_400() {
        let runtime = test_runtime(SessionLifecycle::PerRequest, vec![]).await;

        let (status, body) = chat_inner(&runtime, ChatRequest { message: None }).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No message provided");

        assert!(runtime.memory.get_user_memory("demo_user").await.unwrap().is_empty());
    }
}
