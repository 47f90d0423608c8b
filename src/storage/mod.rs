//! Profile persistence: repository contract and the file-backed store.

pub mod file_store;
pub mod interface;

pub use file_store::{validate_id, FileProfileStore};
pub use interface::ProfileStore;
