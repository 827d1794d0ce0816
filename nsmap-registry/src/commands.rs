// Registry commands (resolve, check, dump, files)

use crate::loader::{read_includer, ClassLoader};
use crate::manifest::load_registry;
use crate::registry::Registry;
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Resolve classes through a loader initialized from the manifest.
/// Returns false if any class was not found.
pub fn resolve_classes(manifest_path: &Path, classes: &[String]) -> Result<bool> {
    let registry = load_registry(manifest_path)?;
    let mut loader = ClassLoader::new();
    registry.initialize(&mut loader);

    let mut all_found = true;
    for class in classes {
        match loader.find_file(class) {
            Some(path) => println!("{} {} -> {}", "✓".green(), class, path.display()),
            None => {
                all_found = false;
                println!("{} {} not found", "✗".red(), class);
            }
        }
    }

    Ok(all_found)
}

/// Report configured paths that do not exist. Returns false on any problem.
pub fn check_manifest(manifest_path: &Path) -> Result<bool> {
    let registry = load_registry(manifest_path)?;
    let problems = registry.verify();

    if problems.is_empty() {
        println!(
            "{} {}: {} prefixes, {} classes, {} eager files",
            "✓".green(),
            manifest_path.display(),
            registry.directory_table().len(),
            registry.class_map().len(),
            registry.eager_files().len()
        );
        return Ok(true);
    }

    for problem in &problems {
        println!("{} {}", "✗".red(), problem);
    }
    println!("{} problem(s) found", problems.len());

    Ok(false)
}

/// Serializable view of a registry, sorted for stable output
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySnapshot {
    pub separator: char,
    pub extension: String,
    pub class_map_authoritative: bool,
    pub prefix_lengths: BTreeMap<char, BTreeMap<String, usize>>,
    pub prefix_dirs: BTreeMap<String, Vec<PathBuf>>,
    pub fallback_dirs: Vec<PathBuf>,
    pub class_map: BTreeMap<String, PathBuf>,
    pub files: Vec<EagerSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct EagerSnapshot {
    pub id: String,
    pub path: PathBuf,
}

impl RegistrySnapshot {
    pub fn of(registry: &Registry) -> Self {
        Self {
            separator: registry.options().separator(),
            extension: registry.options().extension().to_string(),
            class_map_authoritative: registry.is_class_map_authoritative(),
            prefix_lengths: registry
                .prefix_table()
                .iter()
                .map(|(bucket, prefixes)| {
                    let prefixes = prefixes.iter().map(|(p, l)| (p.clone(), *l)).collect();
                    (*bucket, prefixes)
                })
                .collect(),
            prefix_dirs: registry
                .directory_table()
                .iter()
                .map(|(p, dirs)| (p.clone(), dirs.clone()))
                .collect(),
            fallback_dirs: registry.fallback_dirs().to_vec(),
            class_map: registry
                .class_map()
                .iter()
                .map(|(c, p)| (c.clone(), p.clone()))
                .collect(),
            files: registry
                .eager_files()
                .iter()
                .map(|f| EagerSnapshot {
                    id: f.id.clone(),
                    path: f.path.clone(),
                })
                .collect(),
        }
    }
}

/// Print the registry tables
pub fn dump_registry(manifest_path: &Path, json: bool) -> Result<()> {
    let registry = load_registry(manifest_path)?;
    let snapshot = RegistrySnapshot::of(&registry);

    if json {
        let out = serde_json::to_string_pretty(&snapshot).context("Failed to serialize registry")?;
        println!("{}", out);
        return Ok(());
    }

    println!(
        "{} (separator '{}', extension .{}{})",
        manifest_path.display().to_string().bold(),
        snapshot.separator,
        snapshot.extension,
        if snapshot.class_map_authoritative {
            ", authoritative class map"
        } else {
            ""
        }
    );

    println!("\n{}", "Prefixes:".bold());
    for (bucket, prefixes) in &snapshot.prefix_lengths {
        println!("  [{}]", bucket);
        for (prefix, length) in prefixes {
            println!("    {} ({})", prefix, length);
            for dir in snapshot.prefix_dirs.get(prefix).into_iter().flatten() {
                println!("      {}", dir.display());
            }
        }
    }

    if !snapshot.fallback_dirs.is_empty() {
        println!("\n{}", "Fallback directories:".bold());
        for dir in &snapshot.fallback_dirs {
            println!("  {}", dir.display());
        }
    }

    println!("\n{}", "Class map:".bold());
    for (class, path) in &snapshot.class_map {
        println!("  {} -> {}", class, path.display());
    }

    print_eager_files(&registry);
    Ok(())
}

/// List eager files in load order; with `load`, include each one by reading it.
/// Returns how many files this call included.
pub fn list_eager_files(manifest_path: &Path, load: bool) -> Result<usize> {
    let registry = load_registry(manifest_path)?;
    print_eager_files(&registry);

    if !load {
        return Ok(0);
    }

    let mut includer = read_includer;
    let count = registry
        .load_eager_files(&mut includer)
        .context("Failed to load eager files")?;
    println!("\n{} Loaded {} eager file(s)", "✓".green(), count);

    Ok(count)
}

fn print_eager_files(registry: &Registry) {
    println!("\n{}", "Eager files:".bold());
    for (index, file) in registry.eager_files().iter().enumerate() {
        println!("  {:>3}. {}  {}", index + 1, file.id.dimmed(), file.path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let vendor = dir.path().join("vendor");
        fs::create_dir_all(vendor.join("acme/src/Http")).unwrap();
        fs::write(vendor.join("acme/src/Http/Request.php"), "<?php\n").unwrap();
        fs::write(vendor.join("acme/helpers.php"), "<?php\n").unwrap();

        let manifest = dir.path().join("autoload.json");
        fs::write(
            &manifest,
            r#"{
                "vendorDir": "vendor",
                "files": ["acme/helpers.php"],
                "psr4": {"Acme\\": "acme/src"}
            }"#,
        )
        .unwrap();
        (dir, manifest)
    }

    #[test]
    fn test_resolve_classes_reports_missing() {
        let (_dir, manifest) = fixture();
        assert!(resolve_classes(&manifest, &["Acme\\Http\\Request".to_string()]).unwrap());
        assert!(!resolve_classes(&manifest, &["Acme\\Nope".to_string()]).unwrap());
    }

    #[test]
    fn test_check_manifest() {
        let (dir, manifest) = fixture();
        assert!(check_manifest(&manifest).unwrap());

        fs::remove_file(dir.path().join("vendor/acme/helpers.php")).unwrap();
        assert!(!check_manifest(&manifest).unwrap());
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let (_dir, manifest) = fixture();
        let registry = load_registry(&manifest).unwrap();
        let snapshot = RegistrySnapshot::of(&registry);

        assert_eq!(snapshot.prefix_lengths[&'A']["Acme\\"], 5);
        assert_eq!(snapshot.files.len(), 1);

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("prefixLengths"));
    }

    #[test]
    fn test_list_and_load_eager_files() {
        let (_dir, manifest) = fixture();
        let registry = load_registry(&manifest).unwrap();
        let id = &registry.eager_files()[0].id;
        assert_eq!(id, &crate::eager::file_identifier("acme/helpers.php"));

        assert_eq!(list_eager_files(&manifest, false).unwrap(), 0);
        assert!(!registry.is_eager_file_loaded(id));

        assert_eq!(list_eager_files(&manifest, true).unwrap(), 1);
        assert!(registry.is_eager_file_loaded(id));

        // already included in this process, by an earlier registry
        assert_eq!(list_eager_files(&manifest, true).unwrap(), 0);
    }
}
