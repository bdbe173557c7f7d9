pub mod backend;
pub mod embedded;
pub mod filesystem;
pub mod memory;
pub mod store;

pub use backend::StorageBackend;
pub use embedded::RedbBackend;
pub use filesystem::FilesystemBackend;
pub use memory::MemoryBackend;
pub use store::ResultStore;
