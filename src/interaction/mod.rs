//! Turn handling for the bug assistant.
//!
//! This module owns the one piece of state-lifecycle logic original to this
//! service: resolving a session for an incoming chat request, running the
//! agent turn against it, and optionally folding the completed session into
//! the per-user memory log.

pub mod turn;
