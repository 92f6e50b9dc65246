//! Built-in tools: current-date lookup and per-user memory recall.

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use crate::{base::types::Res, service::memory::MemoryStore};

use super::{Tool, ToolContext};

/// Returns the current date in `YYYY-MM-DD` format.
pub struct CurrentDateTool;

#[async_trait]
impl Tool for CurrentDateTool {
    fn name(&self) -> &str {
        "get_current_date"
    }

    fn description(&self) -> &str {
        "Get the current date in the format YYYY-MM-DD."
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        })
    }

    #[instrument(name = "CurrentDateTool::call", skip_all)]
    async fn call(&self, _ctx: &ToolContext, _args: Value) -> Res<Value> {
        Ok(serde_json::json!({
            "current_date": chrono::Utc::now().format("%Y-%m-%d").to_string()
        }))
    }
}

/// Fetches the calling user's memory log for conversational recall.
pub struct LoadMemoryTool {
    memory: MemoryStore,
}

impl LoadMemoryTool {
    pub fn new(memory: MemoryStore) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for LoadMemoryTool {
    fn name(&self) -> &str {
        "load_memory"
    }

    fn description(&self) -> &str {
        "Access information from previous turns in the conversation. Use this when the user asks a follow-up question that refers to earlier exchanges."
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        })
    }

    #[instrument(name = "LoadMemoryTool::call", skip_all)]
    async fn call(&self, ctx: &ToolContext, _args: Value) -> Res<Value> {
        let records = self.memory.get_user_memory(&ctx.user_id).await?;

        Ok(serde_json::to_value(records)?)
    }
}

// Tests.
