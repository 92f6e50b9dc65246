//! Runtime services and shared state for the bug assistant.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    http,
    service::{
        agent::AgentClient,
        memory::MemoryStore,
        session::SessionStore,
        tool::{
            ToolRegistry,
            builtin::{CurrentDateTool, LoadMemoryTool},
            toolbox::load_toolbox_tools,
        },
    },
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the session store, memory store, agent client, and
/// configuration. It is designed to be trivially cloneable, allowing it to be
/// passed around (and into request handlers) without the need for `Arc` or
/// `Mutex`. All services are constructed here, before the HTTP listener
/// binds, so there is no lazy-initialization race between first requests.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The session store instance.
    pub sessions: SessionStore,
    /// The memory store instance.
    pub memory: MemoryStore,
    /// The agent client instance.
    pub agent: AgentClient,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the stores.
        let sessions = SessionStore::surreal(&config).await?;
        let memory = MemoryStore::surreal(&config).await?;

        // Resolve the tool registry: built-ins plus the remote ticket toolbox.
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CurrentDateTool));
        registry.register(Arc::new(LoadMemoryTool::new(memory.clone())));

        if let Some(endpoint) = &config.toolbox_endpoint {
            for tool in load_toolbox_tools(endpoint, &config.toolbox_headers).await? {
                registry.register(tool);
            }
        } else {
            info!("No toolbox endpoint configured; ticket tools unavailable.");
        }

        info!("Tool registry resolved with {} tools.", registry.len());

        // Initialize the agent client.
        let agent = AgentClient::openai(&config, registry);

        Ok(Self { config, sessions, memory, agent })
    }

    /// Start the HTTP surface.
    pub async fn start(&self) -> Void {
        http::serve(self.clone()).await
    }
}
