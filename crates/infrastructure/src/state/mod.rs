//! Persisted client state.

mod file_store;

pub use file_store::{default_state_file, FileKeyValueStore};
