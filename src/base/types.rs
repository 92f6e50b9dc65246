//! Common types and result aliases for the bug assistant.

use serde::{Deserialize, Serialize};

/// The common error type.
pub type Err = anyhow::Error;
/// The common result type.
pub type Res<T> = Result<T, Err>;
/// The common unit result type.
pub type Void = Res<()>;

/// Role string for user-authored content.
pub const ROLE_USER: &str = "user";
/// Role string for agent-authored content.
pub const ROLE_MODEL: &str = "model";

/// Fallback reply when the agent's event stream ends without a final response.
pub const NO_FINAL_RESPONSE_FALLBACK: &str = "Agent did not provide a clear text response.";

/// The triple that identifies a conversation session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    /// The application name.
    pub app_name: String,
    /// The user id.
    pub user_id: String,
    /// The session id (unique within app and user).
    pub session_id: String,
}

impl SessionKey {
    /// Creates a new session key from its parts.
    pub fn new(app_name: impl Into<String>, user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }

    /// Composite record key used by the session store.
    pub fn record_key(&self) -> String {
        format!("{}/{}/{}", self.app_name, self.user_id, self.session_id)
    }
}

/// A single text part of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    /// The text of the part.
    pub text: String,
}

impl Part {
    /// Creates a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A message exchanged between the user and the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// The author role (`user` or `model`).
    pub role: String,
    /// The message parts.
    pub parts: Vec<Part>,
}

impl Content {
    /// Creates a user-authored message with a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ROLE_USER.to_string(),
            parts: vec![Part::text(text)],
        }
    }

    /// Creates an agent-authored message with a single text part.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ROLE_MODEL.to_string(),
            parts: vec![Part::text(text)],
        }
    }

    /// The text of the first part, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.parts.first().map(|p| p.text.as_str())
    }
}

/// A bounded record of one conversational exchange, keyed by app, user, and
/// session identifiers.
///
/// The transcript accumulates one `Content` per user message and one per agent
/// reply. A session must exist before any message is routed to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The application name.
    pub app_name: String,
    /// The user id.
    pub user_id: String,
    /// The session id.
    pub session_id: String,
    /// The transcript of the exchange, one entry per message.
    pub events: Vec<Content>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 last-update timestamp.
    pub updated_at: String,
}

impl Session {
    /// Creates a new, empty session under the key.
    pub fn new(key: &SessionKey) -> Self {
        let now = chrono::Utc::now().to_rfc3339();

        Self {
            app_name: key.app_name.clone(),
            user_id: key.user_id.clone(),
            session_id: key.session_id.clone(),
            events: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// The session's triple key.
    pub fn key(&self) -> SessionKey {
        SessionKey::new(&self.app_name, &self.user_id, &self.session_id)
    }

    /// Append a message to the transcript and bump the updated timestamp.
    pub fn push(&mut self, content: Content) {
        self.events.push(content);
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// A completed session folded into the per-user memory log.
///
/// Keyed by user id only, so all turns from the same user become part of one
/// retrievable history regardless of which session produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// The user id the record is filed under.
    pub user_id: String,
    /// The application name of the source session.
    pub app_name: String,
    /// The session id of the source session.
    pub session_id: String,
    /// The source session's transcript.
    pub events: Vec<Content>,
    /// RFC 3339 timestamp of when the record was filed.
    pub recorded_at: String,
}

impl MemoryRecord {
    /// Snapshots a session into a memory record.
    pub fn from_session(session: &Session) -> Self {
        Self {
            user_id: session.user_id.clone(),
            app_name: session.app_name.clone(),
            session_id: session.session_id.clone(),
            events: session.events.clone(),
            recorded_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// One element of the agent's response stream.
///
/// The first event with `turn_complete` set and a non-empty text part is the
/// terminal, user-facing answer for the turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentEvent {
    /// The event's message content, if any.
    pub content: Option<Content>,
    /// Whether this event terminates the turn.
    pub turn_complete: bool,
}

impl AgentEvent {
    /// A non-final progress event (e.g. a tool invocation note).
    pub fn progress(content: Option<Content>) -> Self {
        Self { content, turn_complete: false }
    }

    /// The terminal event carrying the reply text.
    pub fn final_response(text: impl Into<String>) -> Self {
        Self {
            content: Some(Content::model(text)),
            turn_complete: true,
        }
    }

    /// Whether this event terminates the turn.
    pub fn is_final_response(&self) -> bool {
        self.turn_complete
    }

    /// The reply text, if this is a final event with a non-empty first part.
    pub fn final_text(&self) -> Option<&str> {
        if !self.turn_complete {
            return None;
        }

        self.content.as_ref().and_then(|c| c.first_text()).filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_record_key() {
        let key = SessionKey::new("bug-assistant", "u1", "s1");

        assert_eq!(key.record_key(), "bug-assistant/u1/s1");
    }

    #[test]
    fn test_session_push_updates_transcript() {
        let key = SessionKey::new("app", "user", "session");
        let mut session = Session::new(&key);

        session.push(Content::user("hello"));
        session.push(Content::model("hi there"));

        assert_eq!(session.events.len(), 2);
        assert_eq!(session.events[0].role, ROLE_USER);
        assert_eq!(session.events[1].first_text(), Some("hi there"));
        assert_eq!(session.key(), key);
    }

    #[test]
    fn test_agent_event_final_text() {
        let progress = AgentEvent::progress(None);
        assert!(!progress.is_final_response());
        assert_eq!(progress.final_text(), None);

        let final_event = AgentEvent::final_response("done");
        assert!(final_event.is_final_response());
        assert_eq!(final_event.final_text(), Some("done"));

        let empty_final = AgentEvent {
            content: Some(Content::model("")),
            turn_complete: true,
        };
        assert_eq!(empty_final.final_text(), None);
    }

    #[test]
    fn test_memory_record_from_session() {
        let key = SessionKey::new("app", "user", "session");
        let mut session = Session::new(&key);
        session.push(Content::user("what is my name?"));

        let record = MemoryRecord::from_session(&session);

        assert_eq!(record.user_id, "user");
        assert_eq!(record.session_id, "session");
        assert_eq!(record.events, session.events);
    }
}
