//! Navigation controller.
//!
//! # Responsibility
//! - Maintain the drill path, forward stack, view mode and focus.
//! - Reconcile navigation with the document after history moves.
//!
//! # Invariants
//! - Navigation is independent of undo/redo; it is reconciled through
//!   `NavState::reset_if_needed`, never restored from history.

pub mod breadcrumbs;
pub mod state;
