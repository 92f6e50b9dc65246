pub mod surreal;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{Res, Session, SessionKey, Void};

// Traits.

/// Generic session store trait that clients must implement.
///
/// Sessions are keyed by the (app_name, user_id, session_id) triple. A session
/// must exist before any message is routed to the agent, so callers use
/// `get_or_create_session` once per request.
#[async_trait]
pub trait GenericSessionStore: Send + Sync + 'static {
    /// Gets the session by its triple key, if it exists.
    async fn get_session(&self, key: &SessionKey) -> Res<Option<Session>>;

    /// Creates a new, empty session under the triple key.
    ///
    /// Fails if a session with the same key already exists.
    async fn create_session(&self, key: &SessionKey) -> Res<Session>;

    /// Persists the session's transcript under its key.
    async fn update_session(&self, session: &Session) -> Void;

    /// Gets the session by its key, creating it if absent.
    ///
    /// Concurrent calls with the same key do not create duplicates: a failed
    /// create (first writer won) falls back to a re-fetch.
    async fn get_or_create_session(&self, key: &SessionKey) -> Res<Session> {
        if let Some(session) = self.get_session(key).await? {
            return Ok(session);
        }

        match self.create_session(key).await {
            Ok(session) => Ok(session),
            Err(create_err) => match self.get_session(key).await? {
                Some(session) => Ok(session),
                None => Err(create_err),
            },
        }
    }
}

// Structs.

/// Session store for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<dyn GenericSessionStore>,
}

impl Deref for SessionStore {
    type Target = dyn GenericSessionStore;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl SessionStore {
    pub fn new(inner: Arc<dyn GenericSessionStore>) -> Self {
        Self { inner }
    }
}
