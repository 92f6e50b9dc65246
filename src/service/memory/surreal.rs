//! SurrealDB-backed memory store.
//!
//! Completed sessions are appended to a `memory` table as records keyed by a
//! random id; retrieval filters by user id and orders by a monotonic sequence
//! number so insertion order is stable. The counter is seeded from the
//! existing records at construction, so restarts keep appending after
//! everything already stored.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use surrealdb::{
    Surreal,
    engine::any::{Any, connect},
    opt::auth::Root,
};
use tracing::instrument;

use crate::base::{
    config::Config,
    types::{Content, MemoryRecord, Res, Session, Void},
};

use super::{GenericMemoryStore, MemoryStore};

const NAMESPACE: &str = "bug_assistant";
const DATABASE: &str = "memory";
const TABLE: &str = "memory";

// Extra methods on `MemoryStore` applied by the surreal implementation.

impl MemoryStore {
    /// Creates a memory store backed by the configured SurrealDB endpoint.
    pub async fn surreal(config: &Config) -> Res<Self> {
        let store = SurrealMemoryStore::new(&config.db_endpoint, &config.db_username, &config.db_password).await?;
        Ok(Self { inner: Arc::new(store) })
    }

    /// Creates a memory store backed by the embedded in-memory engine.
    pub async fn surreal_memory() -> Res<Self> {
        let store = SurrealMemoryStore::new("memory", "", "").await?;
        Ok(Self { inner: Arc::new(store) })
    }
}

// Specific implementations.

/// SurrealDB memory store implementation.
#[derive(Clone)]
pub struct SurrealMemoryStore {
    db: Surreal<Any>,
    seq: Arc<AtomicU64>,
}

/// Stored shape of a memory record; `seq` keeps insertion order stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredMemoryRecord {
    seq: u64,
    user_id: String,
    app_name: String,
    session_id: String,
    events: Vec<Content>,
    recorded_at: String,
}

impl StoredMemoryRecord {
    fn new(seq: u64, record: MemoryRecord) -> Self {
        Self {
            seq,
            user_id: record.user_id,
            app_name: record.app_name,
            session_id: record.session_id,
            events: record.events,
            recorded_at: record.recorded_at,
        }
    }

    fn into_record(self) -> MemoryRecord {
        MemoryRecord {
            user_id: self.user_id,
            app_name: self.app_name,
            session_id: self.session_id,
            events: self.events,
            recorded_at: self.recorded_at,
        }
    }
}

impl SurrealMemoryStore {
    /// Connect to the endpoint and select the memory database.
    #[instrument(name = "SurrealMemoryStore::new", skip_all)]
    pub async fn new(endpoint: &str, username: &str, password: &str) -> Res<Self> {
        let endpoint = if endpoint == "memory" { "mem://" } else { endpoint };
        let db = connect(endpoint).await?;

        if !username.is_empty() {
            db.signin(Root { username, password }).await?;
        }

        db.use_ns(NAMESPACE).use_db(DATABASE).await?;

        Self::from_connection(db).await
    }

    /// Build a store over an existing connection, seeding the sequence
    /// counter past the highest stored value so new records sort after
    /// everything already in the table.
    async fn from_connection(db: Surreal<Any>) -> Res<Self> {
        let mut response = db.query(format!("SELECT math::max(seq) AS seq FROM {TABLE} GROUP ALL")).await?;
        let max_seq: Option<u64> = response.take((0, "seq"))?;

        let next = max_seq.map(|seq| seq + 1).unwrap_or(0);

        Ok(Self {
            db,
            seq: Arc::new(AtomicU64::new(next)),
        })
    }
}

#[async_trait]
impl GenericMemoryStore for SurrealMemoryStore {
    #[instrument(name = "SurrealMemoryStore::add_session_to_memory", skip_all)]
    async fn add_session_to_memory(&self, session: &Session) -> Void {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let record = StoredMemoryRecord::new(seq, MemoryRecord::from_session(session));

        let _: Option<StoredMemoryRecord> = self.db.create(TABLE).content(record).await?;

        Ok(())
    }

    #[instrument(name = "SurrealMemoryStore::get_user_memory", skip_all)]
    async fn get_user_memory(&self, user_id: &str) -> Res<Vec<MemoryRecord>> {
        let mut response = self
            .db
            .query(format!("SELECT * FROM {TABLE} WHERE user_id = $user_id ORDER BY seq ASC"))
            .bind(("user_id", user_id.to_string()))
            .await?;

        let records: Vec<StoredMemoryRecord> = response.take(0)?;

        Ok(records.into_iter().map(StoredMemoryRecord::into_record).collect())
    }
}

// Tests.
