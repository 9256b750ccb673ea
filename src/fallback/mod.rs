//! Generic failover layer for offline operation.
//!
//! This module provides a domain-agnostic mechanism that:
//! - Routes each call to a remote backend or a local store, per a fixed mode
//! - Fails over to the local store only when the backend is unreachable
//! - Persists local state as JSON blobs in a durable key-value store

mod layer;
mod storage;
mod traits;

pub use layer::{ApiMode, FallbackLayer};
pub use storage::{read_snapshot, write_snapshot, BlobStorage, MemoryStorage, SqliteStorage};
pub use traits::{CallResult, CallSource, FailoverError};
