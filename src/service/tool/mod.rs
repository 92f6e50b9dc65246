//! The tool registry.
//!
//! Tools are named callables with a uniform (JSON value in, JSON value out)
//! contract. The registry is resolved once at startup from the built-ins and
//! whatever the remote ticket toolbox exposes; the agent dispatches function
//! calls through it by name.

pub mod builtin;
pub mod toolbox;

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;

use crate::base::types::{Res, SessionKey};

// Types.

/// Per-turn context handed to every tool invocation.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

impl ToolContext {
    pub fn from_key(key: &SessionKey) -> Self {
        Self {
            app_name: key.app_name.clone(),
            user_id: key.user_id.clone(),
            session_id: key.session_id.clone(),
        }
    }
}

// Traits.

/// A named capability the agent may invoke to fulfill a request.
#[async_trait]
pub trait Tool: Send + Sync + 'static {
    /// The tool name the agent calls it by.
    fn name(&self) -> &str;

    /// Human-readable description surfaced to the agent.
    fn description(&self) -> &str;

    /// JSON schema for the tool's arguments.
    fn parameters(&self) -> Value;

    /// Invoke the tool.
    async fn call(&self, ctx: &ToolContext, args: Value) -> Res<Value>;
}

// Structs.

/// Registry of tools, looked up by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; a later registration with the same name wins.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.values()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch a call to the named tool; unknown names are an error.
    pub async fn call(&self, ctx: &ToolContext, name: &str, args: Value) -> Res<Value> {
        let tool = self.get(name).ok_or_else(|| anyhow::anyhow!("Unknown tool: `{name}`."))?;

        tool.call(ctx, args).await
    }
}

// Tests.
