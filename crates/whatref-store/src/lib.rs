//! # whatref-store
//!
//! [`HistoryStore`](whatref_core::HistoryStore) implementations:
//!
//! - [`FileHistoryStore`]: durable, one JSON file, atomic rewrites
//! - [`MemoryHistoryStore`]: process-local, for tests and ephemeral runs
//!
//! Both keep at most `max_entries` (default 10) newest-first entries.

pub mod buffer;
pub mod file;
pub mod memory;

pub use buffer::HistoryBuffer;
pub use file::{FileHistoryStore, HistoryConfig};
pub use memory::MemoryHistoryStore;
