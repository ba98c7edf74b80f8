//! Persistence Adapters
//!
//! Implementations of the `OrderStore` trait.

pub mod in_memory;

pub use in_memory::InMemoryOrderStore;
