//! Library root for `bug-assistant`.
//!
//! Bug-assistant is an LLM-powered conversational assistant for software bug
//! triage designed to:
//! - Answer questions about open bug tickets and find similar or duplicate ones
//! - Create and update tickets through a remote ticket toolbox service
//! - Recall earlier turns of a user's conversation from a per-user memory log
//! - Fall back to web search for community-known issues
//!
//! The service integrates with OpenAI for the agent runtime, SurrealDB for
//! session and memory storage, and an MCP toolbox for the ticket database.
//! The architecture is built around extensible traits that allow for
//! different implementations of each service.

#[deny(missing_docs)]
pub mod base;
pub mod http;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the bug-assistant runtime:
/// - Constructs the session and memory stores
/// - Resolves the tool registry and creates the agent client
/// - Starts the HTTP surface for the configured lifecycle variant
pub async fn start(config: Config) -> Void {
    info!("Starting bug-assistant ...");

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
