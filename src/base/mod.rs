//! Core components, types, and utilities for the bug assistant.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - The agent instruction prompt.
//! - Common types and result handling.

pub mod config;
pub mod prompts;
pub mod types;
