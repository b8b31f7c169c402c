//! Persistence layer: chart snapshots and their image assets.
//!
//! # Responsibility
//! - Define the storage contract used by the editing session.
//! - Keep filesystem details out of model and service code.
//!
//! # Invariants
//! - Boundary I/O is the only place core can fail; errors carry the path.
//! - Asset GC is strictly sequenced after its triggering save.

pub mod assets;
pub mod chart_store;
