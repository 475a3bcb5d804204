//! MirrorKV - durable key-value store fronted by an in-memory mirror
//!
//! Every mutation is committed to the durable bucket before the mirror is
//! updated; every read is answered from the mirror alone. Opening a store
//! seeds the mirror with one full scan of the bucket, after which the
//! durable medium is only touched by writes.

pub mod cache;
pub mod error;
pub mod store;

// Re-exports
pub use cache::{CacheStats, MirrorCache};
pub use error::{Error, Result};
pub use store::{MirrorStore, Storage};
