//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate model operators, history, navigation and persistence
//!   into editor-level actions.
//! - Keep FFI/CLI layers decoupled from storage details.

pub mod autosave;
pub mod session;
