//! Domain model for catalog items.
//!
//! # Responsibility
//! - Define the data structures shared by repository, service and callers.
//! - Own schema-level validation so every write path checks the same rules.
//!
//! # Invariants
//! - Every item is identified by a stable `ItemId` derived at creation.
//! - Deletion is a hard delete; there are no tombstones.

pub mod item;
