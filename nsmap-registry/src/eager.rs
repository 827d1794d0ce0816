// Eager files: included once at start-up, independent of class resolution

use crate::error::{IncludeError, RegistryError, Result};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// A file that defines global functions rather than classes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EagerFile {
    /// Stable identifier used to include the file at most once
    pub id: String,
    pub path: PathBuf,
}

/// Host hook that actually loads a file
pub trait Includer {
    fn include(&mut self, path: &Path) -> std::result::Result<(), IncludeError>;
}

impl<F> Includer for F
where
    F: FnMut(&Path) -> std::result::Result<(), IncludeError>,
{
    fn include(&mut self, path: &Path) -> std::result::Result<(), IncludeError> {
        self(path)
    }
}

/// SHA-256 hex digest of a configured path
pub fn file_identifier(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Remembers which eager files have been included, keyed by identifier.
///
/// Each identifier has its own lock, held while the file is included: a caller
/// racing on the same file waits for the include to finish and only then sees
/// it as loaded (or tries again itself if that include failed). Including the
/// same eager file again from inside its own includer deadlocks.
#[derive(Debug, Default)]
pub(crate) struct EagerGuard {
    loaded: DashMap<String, Arc<Mutex<bool>>>,
}

static PROCESS_GUARD: OnceLock<EagerGuard> = OnceLock::new();

impl EagerGuard {
    /// The guard shared by every registry in this process
    pub(crate) fn process() -> &'static EagerGuard {
        PROCESS_GUARD.get_or_init(EagerGuard::default)
    }

    fn slot(&self, id: &str) -> Arc<Mutex<bool>> {
        // clone out so the map shard is not locked during the include
        self.loaded.entry(id.to_string()).or_default().value().clone()
    }

    pub(crate) fn load<I: Includer + ?Sized>(
        &self,
        files: &[EagerFile],
        includer: &mut I,
    ) -> Result<usize> {
        let mut included = 0;

        for file in files {
            let slot = self.slot(&file.id);
            let mut done = slot.lock().unwrap_or_else(PoisonError::into_inner);
            if *done {
                continue;
            }

            if !file.path.is_file() {
                return Err(RegistryError::MissingFile(file.path.clone()));
            }

            includer
                .include(&file.path)
                .map_err(|source| RegistryError::Include {
                    path: file.path.clone(),
                    source,
                })?;
            *done = true;

            log::info!("Included eager file {} ({})", file.path.display(), file.id);
            included += 1;
        }

        Ok(included)
    }

    pub(crate) fn is_loaded(&self, id: &str) -> bool {
        let Some(slot) = self.loaded.get(id).map(|entry| entry.value().clone()) else {
            return false;
        };
        let done = *slot.lock().unwrap_or_else(PoisonError::into_inner);
        done
    }
}
