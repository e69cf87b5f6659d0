//! Storage layer for atomic file operations.

mod atomic_file;
mod config_storage;

pub use atomic_file::{AtomicFile, FileFormat};
pub use config_storage::ConfigStorage;
