pub mod openai;

use std::{ops::Deref, pin::Pin, sync::Arc};

use async_trait::async_trait;
use futures::Stream;

use crate::base::types::{AgentEvent, Res, Session};

// Types.

/// Ordered stream of response events for one agent turn.
///
/// The stream ends when the turn is over; the first event with
/// `turn_complete` set carries the user-facing reply.
pub type EventStream = Pin<Box<dyn Stream<Item = Res<AgentEvent>> + Send>>;

// Traits.

/// Generic agent runtime trait that clients must implement.
///
/// Implementing this trait allows different agent backends to be used with the
/// bug assistant. The agent receives the session (whose transcript provides
/// turn-local history) and the new user message, and produces an event stream.
#[async_trait]
pub trait GenericAgentClient: Send + Sync + 'static {
    /// Run one conversational turn and return the agent's event stream.
    async fn run_turn(&self, session: &Session, user_message: &str) -> Res<EventStream>;
}

// Structs.

/// Agent client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct AgentClient {
    inner: Arc<dyn GenericAgentClient>,
}

impl Deref for AgentClient {
    type Target = dyn GenericAgentClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl AgentClient {
    pub fn new(inner: Arc<dyn GenericAgentClient>) -> Self {
        Self { inner }
    }
}
