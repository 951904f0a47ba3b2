//! Storage Module
//!
//! Raw key-value backends and the typed JSON layer the cache engine talks to.
//!
//! # Backends
//! - [`MemoryBackend`]: process-local HashMap
//! - [`FileBackend`]: single JSON document on disk

mod backend;
mod file;
mod memory;

pub use backend::{Storage, StorageBackend};
pub use file::FileBackend;
pub use memory::MemoryBackend;
