// Manifest parser - autoload.json

use crate::eager::file_identifier;
use crate::registry::{check_prefix, Registry, RegistryBuilder, ResolverOptions};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Generated autoload configuration (autoload.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Base of every relative path below, relative to the manifest's directory
    #[serde(default = "default_vendor_dir")]
    pub vendor_dir: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_separator: Option<String>,

    #[serde(default)]
    pub class_map_authoritative: bool,

    /// Eager files, in load order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<EagerEntry>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub psr4: HashMap<String, DirList>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_dirs: Vec<String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub classmap: HashMap<String, String>,
}

fn default_vendor_dir() -> String {
    ".".to_string()
}

/// Eager file: a bare path or a path with an explicit identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EagerEntry {
    Path(String),
    Detailed { id: String, path: String },
}

impl EagerEntry {
    pub fn path(&self) -> &str {
        match self {
            EagerEntry::Path(path) => path,
            EagerEntry::Detailed { path, .. } => path,
        }
    }

    /// Explicit id, or one derived from the configured path
    pub fn id(&self) -> String {
        match self {
            EagerEntry::Path(path) => file_identifier(path),
            EagerEntry::Detailed { id, .. } => id.clone(),
        }
    }
}

/// One directory or an ordered list of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DirList {
    One(String),
    Many(Vec<String>),
}

impl DirList {
    pub fn as_slice(&self) -> &[String] {
        match self {
            DirList::One(dir) => std::slice::from_ref(dir),
            DirList::Many(dirs) => dirs,
        }
    }
}

impl Manifest {
    /// Parse autoload.json from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;

        Self::from_str(&content)
    }

    /// Parse autoload.json from string
    pub fn from_str(content: &str) -> Result<Self> {
        let manifest: Manifest =
            serde_json::from_str(content).context("Failed to parse autoload.json")?;

        manifest.validate()?;
        Ok(manifest)
    }

    /// Write manifest to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize manifest")?;

        fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Validate manifest
    fn validate(&self) -> Result<()> {
        let options = self.options()?;

        for prefix in self.psr4.keys() {
            // An empty prefix is how fallback directories are spelled
            if !prefix.is_empty() {
                check_prefix(prefix, options.separator())?;
            }
        }

        let mut seen = HashSet::new();
        for entry in &self.files {
            if entry.path().is_empty() {
                anyhow::bail!("Eager file path cannot be empty");
            }
            let id = entry.id();
            if !seen.insert(id.clone()) {
                anyhow::bail!("Eager file '{}' listed twice", id);
            }
        }

        Ok(())
    }

    /// Resolver options, falling back to `\` and `php`
    pub fn options(&self) -> Result<ResolverOptions> {
        let defaults = ResolverOptions::default();

        let separator = match &self.namespace_separator {
            None => defaults.separator(),
            Some(sep) => {
                let mut chars = sep.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => c,
                    _ => anyhow::bail!(
                        "namespaceSeparator must be a single character, got '{}'",
                        sep
                    ),
                }
            }
        };

        let extension = self
            .extension
            .clone()
            .unwrap_or_else(|| defaults.extension().to_string());

        Ok(ResolverOptions::new(separator, extension)?)
    }

    /// Build the registry; relative paths resolve against `base_dir/vendorDir`
    pub fn into_registry(&self, base_dir: &Path) -> Result<Registry> {
        let vendor = base_dir.join(&self.vendor_dir);
        let mut builder = RegistryBuilder::with_options(self.options()?);
        builder.class_map_authoritative(self.class_map_authoritative);

        for entry in &self.files {
            builder
                .add_eager_file(Some(entry.id()), vendor.join(entry.path()))
                .with_context(|| format!("Invalid eager file {}", entry.path()))?;
        }

        // Sorted so that repeated builds register prefixes identically
        let mut prefixes: Vec<_> = self.psr4.iter().collect();
        prefixes.sort_by(|a, b| a.0.cmp(b.0));
        for (prefix, dirs) in prefixes {
            let dirs: Vec<PathBuf> = dirs.as_slice().iter().map(|d| vendor.join(d)).collect();
            builder
                .add_psr4(prefix, dirs, false)
                .with_context(|| format!("Invalid psr4 entry '{}'", prefix))?;
        }

        for dir in &self.fallback_dirs {
            builder.add_fallback_dir(vendor.join(dir));
        }

        for (class, path) in &self.classmap {
            builder.add_class(class.clone(), vendor.join(path));
        }

        let registry = builder.build();
        log::debug!(
            "Registry built from manifest: {} prefixes, {} classes, {} eager files",
            registry.directory_table().len(),
            registry.class_map().len(),
            registry.eager_files().len()
        );
        Ok(registry)
    }
}

/// Load a manifest and build its registry relative to the manifest's location
pub fn load_registry<P: AsRef<Path>>(path: P) -> Result<Registry> {
    let path = path.as_ref();
    let manifest = Manifest::from_file(path)?;
    let base_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    manifest.into_registry(&base_dir)
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            vendor_dir: default_vendor_dir(),
            extension: None,
            namespace_separator: None,
            class_map_authoritative: false,
            files: Vec::new(),
            psr4: HashMap::new(),
            fallback_dirs: Vec::new(),
            classmap: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_manifest() {
        let json = r#"{
            "vendorDir": "vendor",
            "files": [
                "symfony/polyfill-php80/bootstrap.php",
                {"id": "0e6d7bf4", "path": "symfony/polyfill-mbstring/bootstrap.php"}
            ],
            "psr4": {
                "Http\\Client\\": ["php-http/httplug/src", "php-http/client-common/src"],
                "Assert\\": "beberlei/assert/lib/Assert"
            },
            "classmap": {
                "Attribute": "symfony/polyfill-php80/Resources/stubs/Attribute.php"
            }
        }"#;

        let manifest = Manifest::from_str(json).unwrap();
        assert_eq!(manifest.vendor_dir, "vendor");
        assert_eq!(manifest.files.len(), 2);
        assert_eq!(manifest.files[1].id(), "0e6d7bf4");
        assert_eq!(manifest.psr4["Http\\Client\\"].as_slice().len(), 2);
        assert_eq!(
            manifest.psr4["Assert\\"].as_slice(),
            &["beberlei/assert/lib/Assert".to_string()]
        );
        assert!(!manifest.class_map_authoritative);
    }

    #[test]
    fn test_defaults() {
        let manifest = Manifest::from_str("{}").unwrap();
        assert_eq!(manifest.vendor_dir, ".");
        assert_eq!(manifest.options().unwrap(), ResolverOptions::default());
    }

    #[test]
    fn test_rejects_prefix_without_separator() {
        let json = r#"{"psr4": {"Acme": "src"}}"#;
        assert!(Manifest::from_str(json).is_err());
    }

    #[test]
    fn test_rejects_long_separator() {
        let json = r#"{"namespaceSeparator": "::"}"#;
        assert!(Manifest::from_str(json).is_err());
    }

    #[test]
    fn test_rejects_duplicate_eager_files() {
        let json = r#"{"files": ["a.php", "a.php"]}"#;
        assert!(Manifest::from_str(json).is_err());
    }

    #[test]
    fn test_paths_resolve_against_vendor_dir() {
        let json = r#"{
            "vendorDir": "vendor",
            "psr4": {"Acme\\": "acme/src", "": "legacy"},
            "classmap": {"Attribute": "stubs/Attribute.php"},
            "files": ["acme/helpers.php"]
        }"#;
        let manifest = Manifest::from_str(json).unwrap();
        let registry = manifest.into_registry(Path::new("/app")).unwrap();

        assert_eq!(
            registry.directories("Acme\\").unwrap(),
            &[PathBuf::from("/app/vendor/acme/src")]
        );
        assert_eq!(registry.fallback_dirs(), &[PathBuf::from("/app/vendor/legacy")]);
        assert_eq!(
            registry.class_map()["Attribute"],
            PathBuf::from("/app/vendor/stubs/Attribute.php")
        );
        assert_eq!(
            registry.eager_files()[0].path,
            PathBuf::from("/app/vendor/acme/helpers.php")
        );
        assert_eq!(registry.eager_files()[0].id, file_identifier("acme/helpers.php"));
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("autoload.json");

        let mut manifest = Manifest::default();
        manifest.class_map_authoritative = true;
        manifest
            .psr4
            .insert("Acme\\".to_string(), DirList::One("acme".to_string()));
        manifest.to_file(&path).unwrap();

        let loaded = Manifest::from_file(&path).unwrap();
        assert!(loaded.class_map_authoritative);
        assert_eq!(loaded.psr4["Acme\\"], DirList::One("acme".to_string()));
    }

    #[test]
    fn test_load_registry_uses_manifest_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("autoload.json");
        fs::write(&path, r#"{"psr4": {"Acme\\": "src"}}"#).unwrap();

        let registry = load_registry(&path).unwrap();
        assert_eq!(
            registry.directories("Acme\\").unwrap(),
            &[dir.path().join(".").join("src")]
        );
    }
}
