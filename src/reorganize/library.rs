use std::fs;
use std::path::{Path, PathBuf};

use crate::reorganize::catalog::{Catalog, category_dir};
use crate::reorganize::fs_ops::{FsOps, MoveOutcome};
use crate::reorganize::phase_log::{PhaseLog, Status};

/// Result of moving staged title folders into the library.
#[derive(Debug, Default)]
pub struct SortSummary {
    pub log: PhaseLog,
    /// Title folders moved as a whole.
    pub moved: usize,
    /// Title folders merged into an existing destination and removed from staging.
    pub merged: usize,
    /// Title folders sent to the uncategorized bucket.
    pub uncategorized: usize,
    pub failed: usize,
}

/// Move or merge every title folder in `staging_root` into `base/<category>/<title>`.
///
/// Titles missing from the catalog go to `base/<uncategorized>/<title>`.
/// Folders are processed in name order. The staging folder itself is removed
/// once everything in it has been placed.
pub fn sort_staged(
    staging_root: &Path,
    base: &Path,
    catalog: &Catalog,
    uncategorized: &str,
    dry_run: bool,
) -> SortSummary {
    let mut summary = SortSummary::default();
    let mut ops = FsOps::new(dry_run);
    let index = catalog.title_index();

    let bucket = base.join(uncategorized);
    if ops.create_dir(&bucket, &mut summary.log) {
        summary
            .log
            .push(Status::Info, format!("Uncategorized bucket: {}", bucket.display()));
    }

    if !staging_root.is_dir() {
        summary.log.push(
            Status::Info,
            format!("Staging folder not found: {}", staging_root.display()),
        );
        summary.failed = ops.failures();
        return summary;
    }

    let (title_folders, loose_files) = match list_staging(staging_root) {
        Ok(entries) => entries,
        Err(error) => {
            summary.log.push(
                Status::Failed,
                format!("Failed to read {}: {error}", staging_root.display()),
            );
            summary.failed = ops.failures() + 1;
            return summary;
        }
    };

    for file in &loose_files {
        summary.log.push(
            Status::Info,
            format!("Ignoring loose file in staging: {}", file.display()),
        );
    }

    let mut placed = 0;
    for folder in &title_folders {
        let title = crate::path_to_filename_string(folder);
        let destination = if let Some(category) = index.get(&crate::normalize_name(&title)) {
            category_dir(base, category).join(&title)
        } else {
            summary
                .log
                .push(Status::Uncategorized, format!("Unknown → {uncategorized}: {title}"));
            summary.uncategorized += 1;
            bucket.join(&title)
        };

        if ops.exists(&destination) {
            let outcome = ops.safe_merge(folder, &destination, &mut summary.log);
            if outcome.cleaned {
                summary.merged += 1;
                placed += 1;
            }
        } else if ops.safe_move(folder, &destination, &mut summary.log) == MoveOutcome::Moved {
            summary.moved += 1;
            placed += 1;
        }
    }

    if loose_files.is_empty() && placed == title_folders.len() {
        ops.remove_empty_dir(staging_root, &mut summary.log);
    }

    summary.failed = ops.failures();
    summary.log.push(
        Status::Summary,
        format!(
            "Phase B complete. Moved: {}, merged: {}, uncategorized: {}, failed: {}",
            summary.moved, summary.merged, summary.uncategorized, summary.failed
        ),
    );
    summary
}

/// Split the staging folder contents into title folders and loose files, both sorted by name.
fn list_staging(staging_root: &Path) -> std::io::Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut folders = Vec::new();
    let mut files = Vec::new();
    for entry in fs::read_dir(staging_root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            folders.push(entry.path());
        } else {
            files.push(entry.path());
        }
    }
    folders.sort();
    files.sort();
    Ok((folders, files))
}
