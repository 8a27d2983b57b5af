//! Database layer.
//!
//! Components receive an `Arc<dyn Store>`; `FirestoreDb` backs production and
//! `MemoryStore` backs local development and tests.

pub mod firestore;
pub mod memory;
pub mod store;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;
pub use store::Store;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const API_KEYS: &str = "api_keys";
}
