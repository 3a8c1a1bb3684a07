pub mod backup;
pub mod registry;

pub use backup::{BackupError, BackupStore, MemoryStore, RonFileStore};
pub use registry::{GroupEntry, GroupId, GroupRegistry, RegistrySnapshot, Removed, WindowEntry};
