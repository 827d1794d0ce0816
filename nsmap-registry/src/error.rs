// Registry errors

use std::path::PathBuf;
use thiserror::Error;

/// Error raised by the host while including a file
pub type IncludeError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid namespace prefix '{prefix}': {reason}")]
    InvalidPrefix { prefix: String, reason: String },

    #[error("Invalid option {name}: {reason}")]
    InvalidOption { name: &'static str, reason: String },

    #[error("Eager file '{0}' registered twice")]
    DuplicateEagerFile(String),

    #[error("File not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Failed to include {}: {source}", .path.display())]
    Include {
        path: PathBuf,
        #[source]
        source: IncludeError,
    },
}

pub type Result<T> = std::result::Result<T, RegistryError>;
