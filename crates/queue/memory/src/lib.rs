mod store;

pub use store::MemoryQueueStore;
