//! Mandala chart document model.
//!
//! # Responsibility
//! - Define the recursive Cell/Unit/Chart tree.
//! - Provide pure, persistent mutation operators and mirroring sync.
//!
//! # Invariants
//! - Trees are immutable; every edit returns a new root sharing unchanged
//!   subtrees.
//! - Mutation operators are total: unknown ids are a no-op, never an error.

pub mod chart;
pub mod sync;
pub mod tree;
