//! SurrealDB-backed session store.
//!
//! Sessions live in a `session` table keyed by the composite
//! `app_name/user_id/session_id` record key. The `memory` endpoint value
//! selects the embedded in-memory engine, which is also what tests use.

use std::sync::Arc;

use async_trait::async_trait;
use surrealdb::{
    Surreal,
    engine::any::{Any, connect},
    opt::auth::Root,
};
use tracing::instrument;

use crate::base::{
    config::Config,
    types::{Res, Session, SessionKey, Void},
};

use super::{GenericSessionStore, SessionStore};

const NAMESPACE: &str = "bug_assistant";
const DATABASE: &str = "sessions";
const TABLE: &str = "session";

// Extra methods on `SessionStore` applied by the surreal implementation.

impl SessionStore {
    /// Creates a session store backed by the configured SurrealDB endpoint.
    pub async fn surreal(config: &Config) -> Res<Self> {
        let store = SurrealSessionStore::new(&config.db_endpoint, &config.db_username, &config.db_password).await?;
        Ok(Self { inner: Arc::new(store) })
    }

    /// Creates a session store backed by the embedded in-memory engine.
    pub async fn surreal_memory() -> Res<Self> {
        let store = SurrealSessionStore::new("memory", "", "").await?;
        Ok(Self { inner: Arc::new(store) })
    }
}

// Specific implementations.

/// SurrealDB session store implementation.
#[derive(Clone)]
pub struct SurrealSessionStore {
    db: Surreal<Any>,
}

impl SurrealSessionStore {
    /// Connect to the endpoint and select the session database.
    #[instrument(name = "SurrealSessionStore::new", skip_all)]
    pub async fn new(endpoint: &str, username: &str, password: &str) -> Res<Self> {
        let endpoint = if endpoint == "memory" { "mem://" } else { endpoint };
        let db = connect(endpoint).await?;

        if !username.is_empty() {
            db.signin(Root { username, password }).await?;
        }

        db.use_ns(NAMESPACE).use_db(DATABASE).await?;

        Ok(Self { db })
    }
}

#[async_trait]
impl GenericSessionStore for SurrealSessionStore {
    #[instrument(name = "SurrealSessionStore::get_session", skip_all)]
    async fn get_session(&self, key: &SessionKey) -> Res<Option<Session>> {
        let session: Option<Session> = self.db.select((TABLE, key.record_key())).await?;

        Ok(session)
    }

    #[instrument(name = "SurrealSessionStore::create_session", skip_all)]
    async fn create_session(&self, key: &SessionKey) -> Res<Session> {
        let session = Session::new(key);

        let created: Option<Session> = self.db.create((TABLE, key.record_key())).content(session).await?;

        created.ok_or_else(|| anyhow::anyhow!("Failed to create session `{}`.", key.record_key()))
    }

    #[instrument(name = "SurrealSessionStore::update_session", skip_all)]
    async fn update_session(&self, session: &Session) -> Void {
        let key = session.key();

        let _: Option<Session> = self.db.update((TABLE, key.record_key())).content(session.clone()).await?;

        Ok(())
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::types::Content;

    #[tokio::test]
    async fn test_get_or_create_creates_once() {
        let store = SessionStore::surreal_memory().await.unwrap();
        let key = SessionKey::new("app", "u1", "s1");

        let first = store.get_or_create_session(&key).await.unwrap();
        let second = store.get_or_create_session(&key).await.unwrap();

        assert_eq!(first, second);
        assert!(first.events.is_empty());
    }

    #[tokio::test]
    async fn test_get_session_absent_is_none() {
        let store = SessionStore::surreal_memory().await.unwrap();
        let key = SessionKey::new("app", "u1", "missing");

        assert!(store.get_session(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_session_persists_transcript() {
        let store = SessionStore::surreal_memory().await.unwrap();
        let key = SessionKey::new("app", "u1", "s2");

        let mut session = store.get_or_create_session(&key).await.unwrap();
        session.push(Content::user("hello"));
        session.push(Content::model("hi"));
        store.update_session(&session).await.unwrap();

        let fetched = store.get_session(&key).await.unwrap().unwrap();
        assert_eq!(fetched.events.len(), 2);
        assert_eq!(fetched.events[0].first_text(), Some("hello"));
    }

    #[tokio::test]
    async fn test_create_session_twice_fails() {
        let store = SessionStore::surreal_memory().await.unwrap();
        let key = SessionKey::new("app", "u1", "s3");

        store.create_session(&key).await.unwrap();

        assert!(store.create_session(&key).await.is_err());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated_by_key() {
        let store = SessionStore::surreal_memory().await.unwrap();
        let key_a = SessionKey::new("app", "u1", "s4");
        let key_b = SessionKey::new("app", "u2", "s4");

        let mut session_a = store.get_or_create_session(&key_a).await.unwrap();
        session_a.push(Content::user("only for a"));
        store.update_session(&session_a).await.unwrap();

        let session_b = store.get_or_create_session(&key_b).await.unwrap();
        assert!(session_b.events.is_empty());
    }
}
