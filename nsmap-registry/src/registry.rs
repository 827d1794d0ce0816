// Resolution registry: immutable lookup tables built once from generated configuration

use crate::eager::{file_identifier, EagerFile, EagerGuard, Includer};
use crate::error::{RegistryError, Result};
use crate::loader::ClassLoader;
use crate::resolve;
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Bucket key (first character of a prefix) -> prefix -> prefix length in characters
pub type PrefixTable = HashMap<char, HashMap<String, usize>>;

/// Prefix -> candidate base directories, in search order
pub type DirectoryTable = HashMap<String, Vec<PathBuf>>;

/// Fully-qualified class name -> file
pub type ClassMap = HashMap<String, PathBuf>;

/// How class names map onto relative file paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    separator: char,
    extension: String,
}

impl ResolverOptions {
    pub fn new(separator: char, extension: impl Into<String>) -> Result<Self> {
        let extension = extension.into();
        if extension.is_empty() {
            return Err(RegistryError::InvalidOption {
                name: "extension",
                reason: "cannot be empty".to_string(),
            });
        }
        if extension.starts_with('.') {
            return Err(RegistryError::InvalidOption {
                name: "extension",
                reason: format!("'{}' must not start with a dot", extension),
            });
        }
        if separator.is_whitespace() {
            return Err(RegistryError::InvalidOption {
                name: "namespaceSeparator",
                reason: "cannot be whitespace".to_string(),
            });
        }

        Ok(Self {
            separator,
            extension,
        })
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Turn `Sub\Name` into `Sub/Name.<ext>`.
    /// `None` if the result would not stay below the directory it is joined to
    /// (a root, a drive prefix or a `..` anywhere in the name).
    pub fn logical_path(&self, relative_class: &str) -> Option<PathBuf> {
        let mut path = PathBuf::new();
        let mut segments = relative_class.split(self.separator).peekable();

        while let Some(segment) = segments.next() {
            let segment = if segments.peek().is_none() {
                format!("{}.{}", segment, self.extension)
            } else {
                segment.to_string()
            };

            for component in Path::new(&segment).components() {
                match component {
                    Component::Normal(part) => path.push(part),
                    _ => return None,
                }
            }
        }

        Some(path)
    }
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            separator: '\\',
            extension: "php".to_string(),
        }
    }
}

/// The shared lookup tables. Cloning is cheap: every table sits behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub(crate) prefix_lengths: Arc<PrefixTable>,
    pub(crate) prefix_dirs: Arc<DirectoryTable>,
    pub(crate) class_map: Arc<ClassMap>,
    pub(crate) fallback_dirs: Arc<Vec<PathBuf>>,
}

impl Tables {
    /// Register directories for a prefix. An empty prefix registers fallback directories.
    pub(crate) fn add_psr4(
        &mut self,
        options: &ResolverOptions,
        prefix: &str,
        dirs: Vec<PathBuf>,
        prepend: bool,
    ) -> Result<()> {
        if prefix.is_empty() {
            let fallback = Arc::make_mut(&mut self.fallback_dirs);
            merge_dirs(fallback, dirs, prepend);
            return Ok(());
        }

        check_prefix(prefix, options.separator())?;

        // check_prefix guarantees a first character
        if let Some(bucket) = prefix.chars().next() {
            Arc::make_mut(&mut self.prefix_lengths)
                .entry(bucket)
                .or_default()
                .insert(prefix.to_string(), prefix.chars().count());
        }

        let existing = Arc::make_mut(&mut self.prefix_dirs)
            .entry(prefix.to_string())
            .or_default();
        merge_dirs(existing, dirs, prepend);

        Ok(())
    }

    pub(crate) fn add_class_map<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, PathBuf)>,
    {
        Arc::make_mut(&mut self.class_map).extend(entries);
    }
}

fn merge_dirs(existing: &mut Vec<PathBuf>, dirs: Vec<PathBuf>, prepend: bool) {
    if prepend {
        let tail = std::mem::replace(existing, dirs);
        existing.extend(tail);
    } else {
        existing.extend(dirs);
    }
}

/// A non-empty prefix must end with the namespace separator
pub(crate) fn check_prefix(prefix: &str, separator: char) -> Result<()> {
    if prefix.is_empty() {
        return Err(RegistryError::InvalidPrefix {
            prefix: prefix.to_string(),
            reason: "cannot be empty".to_string(),
        });
    }
    if !prefix.ends_with(separator) {
        return Err(RegistryError::InvalidPrefix {
            prefix: prefix.to_string(),
            reason: format!("must end with the namespace separator '{}'", separator),
        });
    }
    Ok(())
}

/// Builder for [`Registry`]
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    options: ResolverOptions,
    class_map_authoritative: bool,
    tables: Tables,
    eager_files: Vec<EagerFile>,
    eager_ids: HashSet<String>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ResolverOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn class_map_authoritative(&mut self, authoritative: bool) -> &mut Self {
        self.class_map_authoritative = authoritative;
        self
    }

    /// Map a namespace prefix to one or more base directories
    pub fn add_psr4<I, P>(&mut self, prefix: &str, dirs: I, prepend: bool) -> Result<&mut Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let dirs = dirs.into_iter().map(Into::into).collect();
        self.tables
            .add_psr4(&self.options, prefix, dirs, prepend)?;
        Ok(self)
    }

    pub fn add_fallback_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        Arc::make_mut(&mut self.tables.fallback_dirs).push(dir.into());
        self
    }

    pub fn add_class(&mut self, class: impl Into<String>, path: impl Into<PathBuf>) -> &mut Self {
        self.tables
            .add_class_map(std::iter::once((class.into(), path.into())));
        self
    }

    /// Append an eager file. Without an id, one is derived from the path.
    pub fn add_eager_file(
        &mut self,
        id: Option<String>,
        path: impl Into<PathBuf>,
    ) -> Result<&mut Self> {
        let path = path.into();
        let id = id.unwrap_or_else(|| file_identifier(&path.to_string_lossy()));

        if !self.eager_ids.insert(id.clone()) {
            return Err(RegistryError::DuplicateEagerFile(id));
        }

        self.eager_files.push(EagerFile { id, path });
        Ok(self)
    }

    pub fn build(self) -> Registry {
        Registry {
            options: self.options,
            class_map_authoritative: self.class_map_authoritative,
            tables: self.tables,
            eager_files: self.eager_files,
            eager_guard: EagerGuard::process(),
        }
    }
}

/// Immutable class-path resolution registry
#[derive(Debug)]
pub struct Registry {
    options: ResolverOptions,
    class_map_authoritative: bool,
    tables: Tables,
    eager_files: Vec<EagerFile>,
    eager_guard: &'static EagerGuard,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Hand the tables to a loader. Calling this again re-installs the same tables.
    pub fn initialize(&self, loader: &mut ClassLoader) {
        loader.install(
            self.tables.clone(),
            self.options.clone(),
            self.class_map_authoritative,
        );
    }

    /// Find the file defining `class`, or `None`
    pub fn resolve(&self, class: &str) -> Option<PathBuf> {
        if let Some(path) = self.tables.class_map.get(class) {
            log::trace!("{} resolved from class map", class);
            return Some(path.clone());
        }

        resolve::find_file(&self.tables, &self.options, class)
    }

    /// Include every eager file not yet included in this process, whichever
    /// registry included it. Returns how many files were included by this call.
    pub fn load_eager_files<I: Includer + ?Sized>(&self, includer: &mut I) -> Result<usize> {
        self.eager_guard.load(&self.eager_files, includer)
    }

    pub fn is_eager_file_loaded(&self, id: &str) -> bool {
        self.eager_guard.is_loaded(id)
    }

    /// Prefixes registered under a bucket, with their lengths
    pub fn prefixes_for(&self, bucket: char) -> Option<&HashMap<String, usize>> {
        self.tables.prefix_lengths.get(&bucket)
    }

    pub fn directories(&self, prefix: &str) -> Option<&[PathBuf]> {
        self.tables.prefix_dirs.get(prefix).map(Vec::as_slice)
    }

    pub fn prefix_table(&self) -> &PrefixTable {
        &self.tables.prefix_lengths
    }

    pub fn directory_table(&self) -> &DirectoryTable {
        &self.tables.prefix_dirs
    }

    pub fn class_map(&self) -> &ClassMap {
        &self.tables.class_map
    }

    pub fn fallback_dirs(&self) -> &[PathBuf] {
        &self.tables.fallback_dirs
    }

    pub fn eager_files(&self) -> &[EagerFile] {
        &self.eager_files
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    pub fn is_class_map_authoritative(&self) -> bool {
        self.class_map_authoritative
    }

    pub(crate) fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Report every configured file or directory that does not exist
    pub fn verify(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let mut classes: Vec<_> = self.tables.class_map.iter().collect();
        classes.sort();
        for (class, path) in classes {
            if !path.is_file() {
                problems.push(format!(
                    "Class map entry {} points to missing file {}",
                    class,
                    path.display()
                ));
            }
        }

        for file in &self.eager_files {
            if !file.path.is_file() {
                problems.push(format!(
                    "Eager file {} is missing: {}",
                    file.id,
                    file.path.display()
                ));
            }
        }

        let mut prefixes: Vec<_> = self.tables.prefix_dirs.iter().collect();
        prefixes.sort();
        for (prefix, dirs) in prefixes {
            for dir in dirs {
                if !dir.is_dir() {
                    problems.push(format!(
                        "Directory for prefix {} is missing: {}",
                        prefix,
                        dir.display()
                    ));
                }
            }
        }

        for dir in self.tables.fallback_dirs.iter() {
            if !dir.is_dir() {
                problems.push(format!("Fallback directory is missing: {}", dir.display()));
            }
        }

        problems
    }
}
