//! Repository layer for the item collection.
//!
//! # Responsibility
//! - Define the data-access contract for catalog items.
//! - Isolate SQLite query details from services and callers.
//!
//! # Invariants
//! - Repository writes enforce model validation before persistence.
//! - Each operation maps to exactly one store statement; there is no
//!   cross-operation coordination.

pub mod item_repo;
