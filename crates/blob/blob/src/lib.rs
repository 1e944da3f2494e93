pub mod error;
pub mod store;
pub mod testing;
pub mod types;

pub use error::BlobError;
pub use store::ObjectStore;
pub use types::{
    BlobKind, DeleteOptions, ObjectEntry, PutOptions, SnapshotDeleteOption, StoredObject,
    collapse_directories, validate_blob_name, validate_container_name,
};
