// nsmap-registry - class-path resolution registry
// Maps namespace prefixes and class names to files, and includes eager files once.

pub mod commands;
pub mod config;
pub mod eager;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod registry;
mod resolve;

pub use commands::{check_manifest, dump_registry, list_eager_files, resolve_classes};
pub use config::{manifest_path, DEFAULT_MANIFEST, MANIFEST_ENV};
pub use eager::{file_identifier, EagerFile, Includer};
pub use error::{IncludeError, RegistryError};
pub use loader::{read_includer, ClassLoader};
pub use manifest::{load_registry, DirList, EagerEntry, Manifest};
pub use registry::{
    ClassMap, DirectoryTable, PrefixTable, Registry, RegistryBuilder, ResolverOptions,
};

/// Registry version
pub const VERSION: &str = "0.1.0";

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_shared_types_are_thread_safe() {
        assert_send_sync::<Registry>();
        assert_send_sync::<ClassLoader>();
    }
}
