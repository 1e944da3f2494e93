pub mod error;
pub mod store;
pub mod testing;
pub mod types;

pub use error::QueueError;
pub use store::QueueStore;
pub use types::{QueueMessage, validate_queue_name};
