// Class loader: the consumer that Registry::initialize populates

use crate::eager::Includer;
use crate::error::{RegistryError, Result};
use crate::registry::{ClassMap, DirectoryTable, Registry, ResolverOptions, Tables};
use crate::resolve;
use dashmap::DashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Answers "where is this class defined?" for the host
#[derive(Debug, Default)]
pub struct ClassLoader {
    tables: Tables,
    options: ResolverOptions,
    class_map_authoritative: bool,
    /// Classes already searched for and not found. Only grows while the
    /// tables stay the same; installing or extending tables clears it.
    missing: DashSet<String>,
}

impl ClassLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn install(
        &mut self,
        tables: Tables,
        options: ResolverOptions,
        class_map_authoritative: bool,
    ) {
        self.tables = tables;
        self.options = options;
        self.class_map_authoritative = class_map_authoritative;
        self.missing.clear();
    }

    /// Locate the file for `class`. A single leading separator is ignored.
    pub fn find_file(&self, class: &str) -> Option<PathBuf> {
        let class = class
            .strip_prefix(self.options.separator())
            .unwrap_or(class);

        if let Some(path) = self.tables.class_map.get(class) {
            return Some(path.clone());
        }

        if self.class_map_authoritative || self.missing.contains(class) {
            return None;
        }

        let found = resolve::find_file(&self.tables, &self.options, class);
        if found.is_none() {
            self.missing.insert(class.to_string());
        }
        found
    }

    /// Find `class` and hand its file to the includer.
    /// `Ok(false)` means the class is unknown; the caller decides whether that is an error.
    pub fn load_class<I: Includer + ?Sized>(&self, class: &str, includer: &mut I) -> Result<bool> {
        let Some(path) = self.find_file(class) else {
            return Ok(false);
        };

        includer
            .include(&path)
            .map_err(|source| RegistryError::Include {
                path: path.clone(),
                source,
            })?;

        Ok(true)
    }

    pub fn add_class_map<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, PathBuf)>,
    {
        self.tables.add_class_map(entries);
        self.missing.clear();
    }

    /// Register more directories for a prefix on this loader only
    pub fn add_psr4<I, P>(&mut self, prefix: &str, dirs: I, prepend: bool) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let dirs = dirs.into_iter().map(Into::into).collect();
        self.tables.add_psr4(&self.options, prefix, dirs, prepend)?;
        self.missing.clear();
        Ok(())
    }

    pub fn set_class_map_authoritative(&mut self, authoritative: bool) {
        self.class_map_authoritative = authoritative;
    }

    pub fn is_class_map_authoritative(&self) -> bool {
        self.class_map_authoritative
    }

    pub fn prefixes_psr4(&self) -> &DirectoryTable {
        &self.tables.prefix_dirs
    }

    pub fn class_map(&self) -> &ClassMap {
        &self.tables.class_map
    }

    pub fn fallback_dirs(&self) -> &[PathBuf] {
        &self.tables.fallback_dirs
    }

    /// True while this loader still reads the registry's own tables
    pub fn shares_tables_with(&self, registry: &Registry) -> bool {
        let theirs = registry.tables();
        Arc::ptr_eq(&self.tables.prefix_lengths, &theirs.prefix_lengths)
            && Arc::ptr_eq(&self.tables.prefix_dirs, &theirs.prefix_dirs)
            && Arc::ptr_eq(&self.tables.class_map, &theirs.class_map)
    }

    pub fn is_known_missing(&self, class: &str) -> bool {
        self.missing.contains(class)
    }
}

/// Include `path` by reading it; for hosts that only need the file checked
pub fn read_includer(path: &Path) -> std::result::Result<(), crate::error::IncludeError> {
    std::fs::read(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn registry_at(root: &TempDir) -> Registry {
        let src = root.path().join("src");
        fs::create_dir_all(src.join("Http")).unwrap();
        fs::write(src.join("Http").join("Request.php"), "<?php\n").unwrap();

        let mut builder = Registry::builder();
        builder.add_psr4("Acme\\", [src], false).unwrap();
        builder.add_class("Stringable", root.path().join("Stringable.php"));
        builder.build()
    }

    #[test]
    fn test_initialize_shares_tables() {
        let root = TempDir::new().unwrap();
        let registry = registry_at(&root);
        let mut loader = ClassLoader::new();

        registry.initialize(&mut loader);
        assert!(loader.shares_tables_with(&registry));
        assert_eq!(loader.class_map().len(), 1);

        registry.initialize(&mut loader);
        assert!(loader.shares_tables_with(&registry));
        assert_eq!(loader.prefixes_psr4(), registry.directory_table());
    }

    #[test]
    fn test_find_file_matches_registry() {
        let root = TempDir::new().unwrap();
        let registry = registry_at(&root);
        let mut loader = ClassLoader::new();
        registry.initialize(&mut loader);

        for class in ["Acme\\Http\\Request", "Stringable", "Acme\\Nope", "Zzz"] {
            assert_eq!(loader.find_file(class), registry.resolve(class), "{}", class);
        }
        assert_eq!(
            loader.find_file("\\Acme\\Http\\Request"),
            registry.resolve("Acme\\Http\\Request")
        );
    }

    #[test]
    fn test_misses_are_memoized_until_tables_change() {
        let root = TempDir::new().unwrap();
        let registry = registry_at(&root);
        let mut loader = ClassLoader::new();
        registry.initialize(&mut loader);

        assert_eq!(loader.find_file("Acme\\Later"), None);
        assert!(loader.is_known_missing("Acme\\Later"));

        let late = root.path().join("Later.php");
        loader.add_class_map([("Acme\\Later".to_string(), late.clone())]);
        assert!(!loader.is_known_missing("Acme\\Later"));
        assert_eq!(loader.find_file("Acme\\Later"), Some(late));
    }

    #[test]
    fn test_authoritative_class_map_skips_prefixes() {
        let root = TempDir::new().unwrap();
        let registry = registry_at(&root);
        let mut loader = ClassLoader::new();
        registry.initialize(&mut loader);
        loader.set_class_map_authoritative(true);

        assert_eq!(loader.find_file("Acme\\Http\\Request"), None);
        assert!(loader.find_file("Stringable").is_some());
        assert!(!loader.is_known_missing("Acme\\Http\\Request"));
    }

    #[test]
    fn test_loader_extension_leaves_registry_untouched() {
        let root = TempDir::new().unwrap();
        let registry = registry_at(&root);
        let mut loader = ClassLoader::new();
        registry.initialize(&mut loader);

        loader
            .add_psr4("Plugin\\", [root.path().join("plugins")], false)
            .unwrap();

        assert!(!loader.shares_tables_with(&registry));
        assert!(loader.prefixes_psr4().contains_key("Plugin\\"));
        assert!(registry.directories("Plugin\\").is_none());
        assert!(registry.prefixes_for('P').is_none());
    }

    #[test]
    fn test_load_class_includes_found_file() {
        let root = TempDir::new().unwrap();
        let registry = registry_at(&root);
        let mut loader = ClassLoader::new();
        registry.initialize(&mut loader);

        let mut included = Vec::new();
        let mut includer = |path: &Path| -> std::result::Result<(), crate::error::IncludeError> {
            included.push(path.to_path_buf());
            Ok(())
        };

        assert!(loader.load_class("Acme\\Http\\Request", &mut includer).unwrap());
        assert!(!loader.load_class("Acme\\Missing", &mut includer).unwrap());
        assert_eq!(included.len(), 1);
    }

    #[test]
    fn test_read_includer_reports_unreadable_file() {
        let root = TempDir::new().unwrap();
        assert!(read_includer(&root.path().join("absent.php")).is_err());
    }
}
