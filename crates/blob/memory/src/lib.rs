mod store;

pub use store::{DEFAULT_ENDPOINT, MemoryObjectStore};
