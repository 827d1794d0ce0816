// Prefix-based lookup over the registry tables

use crate::registry::{ResolverOptions, Tables};
use std::path::{Path, PathBuf};

/// Longest registered prefix of `class` within its bucket
pub(crate) fn longest_prefix<'t>(tables: &'t Tables, class: &str) -> Option<&'t str> {
    let bucket = class.chars().next()?;

    tables
        .prefix_lengths
        .get(&bucket)?
        .iter()
        .filter(|(prefix, _)| class.starts_with(prefix.as_str()))
        .max_by_key(|(_, length)| **length)
        .map(|(prefix, _)| prefix.as_str())
}

/// Search prefix directories, then fallback directories, for the file defining `class`.
/// The class map is the caller's business.
pub(crate) fn find_file(tables: &Tables, options: &ResolverOptions, class: &str) -> Option<PathBuf> {
    if let Some(prefix) = longest_prefix(tables, class) {
        let Some(relative) = options.logical_path(&class[prefix.len()..]) else {
            log::debug!("{} is not a valid relative file name under {}", class, prefix);
            return None;
        };
        let dirs = tables.prefix_dirs.get(prefix).map(Vec::as_slice).unwrap_or(&[]);

        let found = first_existing(dirs, &relative);
        match &found {
            Some(path) => log::debug!("{} resolved via {} to {}", class, prefix, path.display()),
            None => log::debug!("{} matched {} but no candidate file exists", class, prefix),
        }
        return found;
    }

    if tables.fallback_dirs.is_empty() {
        log::trace!("{} matches no registered prefix", class);
        return None;
    }

    let relative = options.logical_path(class)?;
    let found = first_existing(&tables.fallback_dirs, &relative);
    if let Some(path) = &found {
        log::debug!("{} resolved via fallback to {}", class, path.display());
    }
    found
}

fn first_existing(dirs: &[PathBuf], relative: &Path) -> Option<PathBuf> {
    dirs.iter()
        .map(|dir| dir.join(relative))
        .find(|candidate| candidate.is_file())
}
