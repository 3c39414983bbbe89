mod client;
mod in_memory;

pub use client::ResourceStore;
pub use client::StoreError;
pub use in_memory::InMemoryError;
pub use in_memory::InMemoryStore;

pub type SharedStore<C> = std::sync::Arc<C>;
