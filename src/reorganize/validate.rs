use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::reorganize::catalog::Catalog;
use crate::reorganize::phase_log::{PhaseLog, Status};

/// System and cache directory names that are never reported.
const CACHE_DIRS: &[&str] = &[
    "__pycache__",
    "#recycle",
    "$RECYCLE.BIN",
    "System Volume Information",
    "lost+found",
];

/// Outcome of auditing the library against the catalog.
#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub base: PathBuf,
    /// Expected title directories that do not exist.
    pub missing: Vec<PathBuf>,
    /// Directories not accounted for by the catalog or the allow-list.
    pub unexpected: Vec<PathBuf>,
    /// Directories that could not be read.
    pub errors: Vec<String>,
    #[serde(skip)]
    pub log: PhaseLog,
}

impl ValidationReport {
    /// True when the library matches the catalog exactly.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }

    /// Serialize the report as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize validation report")
    }
}

/// Check the library under `base` against the catalog without modifying anything.
///
/// Reports every expected `base/<category>/<title>` directory that is missing,
/// and every directory that is neither a title directory, a category directory
/// (or one of its parents), nor inside an allow-listed utility path.
/// Hidden and cache directories and everything inside title directories are ignored.
/// The uncategorized bucket itself is accepted, but the titles waiting in it are reported.
pub fn validate_library(base: &Path, catalog: &Catalog, allowed: &[PathBuf], uncategorized: &str) -> ValidationReport {
    let base = crate::absolute_path(base);
    let mut report = ValidationReport {
        base: base.clone(),
        ..ValidationReport::default()
    };

    let expected = catalog.expected_title_dirs(&base);
    report.missing = expected
        .iter()
        .filter(|(_, path)| !path.is_dir())
        .map(|(_, path)| path.clone())
        .collect();

    let title_dirs: HashSet<String> = expected.iter().map(|(_, path)| path_key(path)).collect();
    let mut category_dirs: HashSet<String> = catalog.category_dirs(&base).iter().map(|path| path_key(path)).collect();
    category_dirs.insert(path_key(&base.join(uncategorized)));
    let allowed: Vec<PathBuf> = allowed.iter().map(|path| crate::absolute_path(path)).collect();

    if base.is_dir() {
        let walker = WalkDir::new(&base)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.file_type().is_dir()
                    && !is_hidden_or_cache(entry)
                    && !allowed.iter().any(|path| entry.path().starts_with(path))
                    && !title_dirs.contains(&path_key(entry.path()))
            });

        for entry in walker {
            match entry {
                Ok(entry) => {
                    if !category_dirs.contains(&path_key(entry.path())) {
                        report.unexpected.push(entry.into_path());
                    }
                }
                Err(error) => report.errors.push(error.to_string()),
            }
        }
    } else {
        report
            .errors
            .push(format!("Library folder not found: {}", base.display()));
    }

    report.log = summary_log(&report);
    report
}

/// Summary counts first, then the itemized lists.
fn summary_log(report: &ValidationReport) -> PhaseLog {
    let mut log = PhaseLog::new();
    log.push(Status::Summary, "Phase C Summary");
    log.push(Status::Summary, format!("   Missing: {}", report.missing.len()));
    log.push(Status::Summary, format!("   Unexpected: {}", report.unexpected.len()));
    for path in &report.missing {
        log.push(Status::MissingTitle, format!("Missing: {}", path.display()));
    }
    for path in &report.unexpected {
        log.push(Status::Unexpected, format!("Unexpected: {}", path.display()));
    }
    for error in &report.errors {
        log.push(Status::Failed, error.clone());
    }
    log
}

fn is_hidden_or_cache(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    crate::is_hidden(entry) || name.starts_with('@') || CACHE_DIRS.contains(&name.as_ref())
}

/// Comparable form of a path, insensitive to Unicode normalization differences.
fn path_key(path: &Path) -> String {
    crate::normalize_name(&crate::path_to_string(path))
}

#[cfg(test)]
mod validate_tests {
    use super::*;

    use std::collections::BTreeMap;
    use std::fs;

    use tempfile::tempdir;

    use crate::reorganize::UNCATEGORIZED_DIR;

    fn catalog(entries: &[(&str, &str)]) -> Catalog {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (category, title) in entries {
            map.entry((*category).to_string()).or_default().push((*title).to_string());
        }
        Catalog::new(map)
    }

    fn mkdir(path: &Path) {
        fs::create_dir_all(path).unwrap();
    }

    #[test]
    fn matching_library_is_clean() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        mkdir(&base.join("Horror").join("The Thing (1982)").join("Subs"));
        mkdir(&base.join("Sci-Fi").join("Space").join("Alien (1979)"));
        fs::write(base.join("Horror").join("The Thing (1982)").join("The Thing (1982).mkv"), "").unwrap();

        let catalog = catalog(&[("Horror", "The Thing (1982)"), ("Sci-Fi/Space", "Alien (1979)")]);
        let report = validate_library(base, &catalog, &[], UNCATEGORIZED_DIR);

        assert!(report.is_clean(), "{:?}", report);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn reports_missing_titles() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        mkdir(&base.join("Horror"));

        let catalog = catalog(&[("Horror", "The Thing (1982)")]);
        let report = validate_library(base, &catalog, &[], UNCATEGORIZED_DIR);

        assert_eq!(report.missing.len(), 1);
        assert!(report.missing[0].ends_with("Horror/The Thing (1982)"));
        assert!(report.unexpected.is_empty());
        assert_eq!(report.log.count(Status::MissingTitle), 1);
    }

    #[test]
    fn reports_unexpected_directories() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        mkdir(&base.join("Horror").join("The Thing (1982)"));
        mkdir(&base.join("Horror").join("Stray Folder"));
        mkdir(&base.join("Random"));

        let catalog = catalog(&[("Horror", "The Thing (1982)")]);
        let report = validate_library(base, &catalog, &[], UNCATEGORIZED_DIR);

        let base = crate::absolute_path(base);
        assert_eq!(
            report.unexpected,
            vec![base.join("Horror").join("Stray Folder"), base.join("Random")]
        );
        assert_eq!(report.log.count(Status::Unexpected), 2);
    }

    #[test]
    fn ignores_hidden_cache_and_allowed_directories() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        mkdir(&base.join(".trash").join("old"));
        mkdir(&base.join("@eaDir"));
        mkdir(&base.join("temp_movies").join("renamed").join("Something (2000)"));
        mkdir(&base.join("Horror").join("The Thing (1982)"));

        let catalog = catalog(&[("Horror", "The Thing (1982)")]);
        let report = validate_library(base, &catalog, &[base.join("temp_movies")], UNCATEGORIZED_DIR);

        assert!(report.is_clean(), "{:?}", report.unexpected);
    }

    #[test]
    fn title_in_wrong_category_is_missing_and_unexpected() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        mkdir(&base.join("Comedy").join("The Thing (1982)"));
        mkdir(&base.join("Horror"));

        let catalog = catalog(&[("Horror", "The Thing (1982)"), ("Comedy", "Airplane! (1980)")]);
        let report = validate_library(base, &catalog, &[], UNCATEGORIZED_DIR);

        assert_eq!(report.missing.len(), 2);
        assert_eq!(report.unexpected.len(), 1);
        assert!(report.unexpected[0].ends_with("Comedy/The Thing (1982)"));
    }

    #[test]
    fn uncategorized_titles_are_reported_but_bucket_is_not() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        mkdir(&base.join(UNCATEGORIZED_DIR).join("Unknown (2011)"));
        mkdir(&base.join("Horror").join("The Thing (1982)"));

        let catalog = catalog(&[("Horror", "The Thing (1982)")]);
        let report = validate_library(base, &catalog, &[], UNCATEGORIZED_DIR);

        assert_eq!(report.unexpected.len(), 1);
        assert!(report.unexpected[0].ends_with("_Uncategorized/Unknown (2011)"));
    }

    #[test]
    fn validation_never_mutates() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        mkdir(&base.join("Random"));

        let _ = validate_library(base, &catalog(&[("Horror", "The Thing (1982)")]), &[], UNCATEGORIZED_DIR);

        assert!(base.join("Random").is_dir());
        assert!(!base.join("Horror").exists());
    }

    #[test]
    fn missing_library_folder_is_an_error_entry() {
        let dir = tempdir().unwrap();
        let report = validate_library(&dir.path().join("nope"), &catalog(&[("Horror", "X (2000)")]), &[], UNCATEGORIZED_DIR);
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn report_serializes_to_json() {
        let dir = tempdir().unwrap();
        let report = validate_library(dir.path(), &catalog(&[("Horror", "X (2000)")]), &[], UNCATEGORIZED_DIR);
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["missing"].as_array().unwrap().len(), 1);
        assert!(json["unexpected"].as_array().unwrap().is_empty());
        assert!(json.get("log").is_none());
    }
}
