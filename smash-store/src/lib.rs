pub mod app_config;
pub mod blob;
pub mod registry;
pub mod sealed;
pub mod secrets;

pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use registry::Registry;
pub use sealed::StorageKey;
pub use secrets::SecretBundle;
