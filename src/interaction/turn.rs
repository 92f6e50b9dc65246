//! The turn session/memory manager.
//!
//! Per-request lifecycle: the session is resolved (created if absent) before
//! any message is routed to the agent; the agent's event stream is consumed in
//! order until the first final response; the exchange is appended to the
//! session transcript; and, in the per-request deployment variant, the
//! completed session is committed to memory. Errors propagate to the endpoint
//! boundary; there is no retry and no rollback of a created session.

use futures::StreamExt;
use tracing::{debug, instrument, warn};

use crate::{
    base::types::{Content, NO_FINAL_RESPONSE_FALLBACK, Res, SessionKey, Void},
    service::{agent::AgentClient, memory::MemoryStore, session::SessionStore},
};

/// Run one conversational turn and return the agent's reply text.
///
/// Consumes the agent's event stream and returns the text of the first event
/// marked final; if the stream ends without one, returns the fixed fallback
/// string.
#[instrument(skip_all, fields(session = %key.record_key()))]
pub async fn run_turn(sessions: &SessionStore, agent: &AgentClient, key: &SessionKey, user_message: &str) -> Res<String> {
    // The session must exist before the message is routed to the agent.
    let mut session = sessions.get_or_create_session(key).await?;

    debug!("Session resolved; running agent turn.");

    let mut events = agent.run_turn(&session, user_message).await?;

    let mut final_text = None;

    while let Some(event) = events.next().await {
        let event = event?;

        if let Some(text) = event.final_text() {
            final_text = Some(text.to_string());
            break;
        }
    }

    let reply = match final_text {
        Some(text) => text,
        None => {
            warn!("Agent stream ended without a final response.");
            NO_FINAL_RESPONSE_FALLBACK.to_string()
        }
    };

    debug!("Final response captured.");

    // Fold the exchange into the session transcript.
    session.push(Content::user(user_message));
    session.push(Content::model(reply.clone()));
    sessions.update_session(&session).await?;

    Ok(reply)
}

/// Commit a completed session to the per-user memory log.
///
/// The session is re-fetched by its key; a missing session is a silent skip,
/// not an error.
#[instrument(skip_all, fields(session = %key.record_key()))]
pub async fn commit_to_memory(sessions: &SessionStore, memory: &MemoryStore, key: &SessionKey) -> Void {
    match sessions.get_session(key).await? {
        Some(session) => {
            memory.add_session_to_memory(&session).await?;
            debug!("Session committed to memory.");
            Ok(())
        }
        None => {
            warn!("Session not found for memory commit; skipping.");
            Ok(())
        }
    }
}

// Tests.
