//! Persistent system configuration: a 7-byte record in a fixed key/value
//! slot.

mod backend;
mod config;
mod error;
mod storage;

pub use backend::{FileBackend, KvBackend, MemoryBackend};
pub use config::{SysConfig, DEFAULT_MAGIC};
pub use error::{StorageError, StorageResult};
pub use storage::{SysStorage, CONFIG_KEY, NAMESPACE};
