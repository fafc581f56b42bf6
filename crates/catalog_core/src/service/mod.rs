//! Use-case services over the item repository.
//!
//! # Responsibility
//! - Expose the catalog operations to callers without storage details.
//! - Keep async/FFI-style front ends decoupled from SQL.

pub mod item_service;
