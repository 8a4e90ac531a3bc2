// Adapters layer: concrete implementations of the store port.

pub mod local_store;
pub mod memory_store;

pub use local_store::LocalStore;
pub use memory_store::MemoryStore;
