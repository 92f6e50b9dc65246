//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for the services used by the bug assistant:
//! - The agent runtime (e.g., OpenAI)
//! - Session and memory stores (e.g., SurrealDB)
//! - The tool registry (built-ins plus the remote ticket toolbox)
//!
//! Each service module defines both generic traits and concrete implementations,
//! allowing for extensibility and easy testing.

pub mod agent;
pub mod memory;
pub mod session;
pub mod tool;
