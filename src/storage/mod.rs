pub mod blob_store;
pub mod keys;

pub use blob_store::{BlobStore, ByteStream, ObjectBlobStore, StoreError};
