use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::reorganize::catalog::RenameMap;
use crate::reorganize::fs_ops::{FsOps, MoveOutcome};
use crate::reorganize::phase_log::{PhaseLog, Status};

/// Result of the rename and stage phase.
#[derive(Debug, Default)]
pub struct StageSummary {
    pub log: PhaseLog,
    /// Number of files staged, or that would be staged in a dry run.
    pub staged: usize,
    pub failed: usize,
    /// Original and new file name for every staged file.
    pub renames: Vec<(String, String)>,
}

/// Find each mis-named file under `source_root`, rename it to its canonical name
/// and move it into `staging_root/<title>/<new name>`.
///
/// Every rename entry is handled independently: a missing, ambiguous or
/// already staged entry is logged and skipped without affecting the others.
pub fn stage_files(rename_map: &RenameMap, source_root: &Path, staging_root: &Path, dry_run: bool) -> StageSummary {
    let mut summary = StageSummary::default();
    let mut ops = FsOps::new(dry_run);

    if !source_root.is_dir() {
        summary.log.push(
            Status::Missing,
            format!("Source folder not found: {}", source_root.display()),
        );
        return summary;
    }

    if !ops.ensure_dir(staging_root, &mut summary.log) {
        summary.failed = ops.failures();
        return summary;
    }

    let files_by_name = index_source_files(source_root, staging_root, &mut summary.log);

    for (old_name, new_name) in rename_map.iter() {
        let title = RenameMap::title_for(new_name);
        let destination = staging_root.join(&title).join(new_name);

        if ops.exists(&destination) {
            summary.log.push(
                Status::AlreadyExists,
                format!("Already exists: {}", destination.display()),
            );
            continue;
        }

        let matches: Vec<&PathBuf> = files_by_name
            .get(&crate::normalize_name(old_name))
            .map(|paths| paths.iter().filter(|path| ops.exists(path)).collect())
            .unwrap_or_default();

        match matches.as_slice() {
            [] => summary.log.push(Status::NotFound, format!("Not found: {old_name}")),
            [source] => {
                if ops.stage_move(source, &destination, &mut summary.log) == MoveOutcome::Moved {
                    summary.staged += 1;
                    summary.renames.push((old_name.to_string(), new_name.to_string()));
                }
            }
            _ => summary.log.push(
                Status::Ambiguous,
                format!("Multiple matches for {old_name} ({}), skipped", matches.len()),
            ),
        }
    }

    summary.failed = ops.failures();
    summary.log.push(
        Status::Summary,
        format!("Phase A complete. Files staged: {}", summary.staged),
    );
    summary
}

/// Map normalized file names to every path under `root` with that name.
/// The staging directory is skipped so already staged files are never matched again.
fn index_source_files(root: &Path, staging_root: &Path, log: &mut PhaseLog) -> HashMap<String, Vec<PathBuf>> {
    let staging_root = crate::absolute_path(staging_root);
    let mut files: HashMap<String, Vec<PathBuf>> = HashMap::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !(entry.file_type().is_dir() && crate::absolute_path(entry.path()) == staging_root));

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                files
                    .entry(crate::get_normalized_file_name(entry.path()))
                    .or_default()
                    .push(entry.into_path());
            }
            Ok(_) => {}
            Err(error) => log.push(Status::Failed, format!("Failed to read source tree: {error}")),
        }
    }

    files
}
