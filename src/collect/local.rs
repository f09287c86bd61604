use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;

use crate::bibliography::{parse_bibtex, BibliographyRecord};
use crate::data::loader::{is_datapackage, load_datapackage};
use crate::data::model::DataPackage;

/// Files below `dir` with the extension `ext`, in path order.
fn files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Not a directory: {}", dir.display());
    }
    Ok(WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::warn!("Skipping unreadable path below {}: {err}", dir.display());
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(ext))
        })
        .collect())
}

/// Every data package described by a `*.json` file below `dir`.
///
/// JSON files that are not package descriptors are skipped.
pub fn collect_datapackages(dir: &Path) -> Result<Vec<DataPackage>> {
    let mut packages = Vec::new();
    for path in files_with_extension(dir, "json")? {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let is_package = serde_json::from_str(&text)
            .map(|value| is_datapackage(&value))
            .unwrap_or(false);
        if !is_package {
            log::debug!("Skipping {}: not a data package", path.display());
            continue;
        }
        packages.push(load_datapackage(&path)?);
    }
    log::debug!("Collected {} data packages below {}", packages.len(), dir.display());
    Ok(packages)
}

/// Every bibliography record in a `*.bib` file below `dir`.
pub fn collect_bibliography(dir: &Path) -> Result<Vec<BibliographyRecord>> {
    let mut records = Vec::new();
    for path in files_with_extension(dir, "bib")? {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        records.extend(parse_bibtex(&text).with_context(|| format!("parsing {}", path.display()))?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_collect_from_bundled_samples() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("data").join("examples");
        let packages = collect_datapackages(&dir).unwrap();
        let names: Vec<&str> = packages.iter().map(|p| p.name()).collect();
        assert_eq!(
            names,
            [
                "alves_2011_electrochemistry_6010_f1a_solid",
                "engstfeld_2018_polycrystalline_17743_f4b_1"
            ]
        );

        let records = collect_bibliography(&dir).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_unrelated_json_skipped() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("settings.json"), r#"{"theme": "dark"}"#).unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();
        assert!(collect_datapackages(dir.path()).unwrap().is_empty());
        assert!(collect_bibliography(dir.path()).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let samples = Path::new(env!("CARGO_MANIFEST_DIR")).join("data").join("examples");
        let dir = tempdir().unwrap();
        let readable = dir.path().join("readable");
        let locked = dir.path().join("locked");
        std::fs::create_dir(&readable).unwrap();
        std::fs::create_dir(&locked).unwrap();
        for name in [
            "engstfeld_2018_polycrystalline_17743_f4b_1.json",
            "engstfeld_2018_polycrystalline_17743_f4b_1.csv",
        ] {
            std::fs::copy(
                samples.join("engstfeld_2018_polycrystalline_17743").join(name),
                readable.join(name),
            )
            .unwrap();
        }
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        let packages = collect_datapackages(dir.path());
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        let packages = packages.unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].name(), "engstfeld_2018_polycrystalline_17743_f4b_1");
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempdir().unwrap();
        assert!(collect_datapackages(&dir.path().join("missing")).is_err());
    }
}
