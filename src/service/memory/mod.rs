pub mod surreal;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{MemoryRecord, Res, Session, Void};

// Traits.

/// Generic memory store trait that clients must implement.
///
/// Memory is a per-user, cross-session, insertion-ordered log of completed
/// conversational exchanges, used for recall by the `load_memory` tool.
#[async_trait]
pub trait GenericMemoryStore: Send + Sync + 'static {
    /// Appends a completed session to the memory log under its user id.
    async fn add_session_to_memory(&self, session: &Session) -> Void;

    /// Fetches all memory records for a user, in insertion order.
    async fn get_user_memory(&self, user_id: &str) -> Res<Vec<MemoryRecord>>;
}

// Structs.

/// Memory store for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<dyn GenericMemoryStore>,
}

impl Deref for MemoryStore {
    type Target = dyn GenericMemoryStore;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl MemoryStore {
    pub fn new(inner: Arc<dyn GenericMemoryStore>) -> Self {
        Self { inner }
    }
}
