//! MirrorKV Durable - redb-backed persistence layer
//!
//! This crate wraps the `redb` embedded database behind a bucket-scoped
//! handle: one database file per container path, one redb table per named
//! bucket. All mutations are single-key write transactions committed before
//! they return, so anything a caller has seen succeed survives a restart.
//!
//! Reads are expected to be served from a cache above this crate; the only
//! read paths here are the startup full-bucket scan and a point `get` kept
//! for tests and diagnostics.

mod registry;
pub mod store;

// Re-exports
pub use store::{DurableError, DurableResult, DurableStore};
