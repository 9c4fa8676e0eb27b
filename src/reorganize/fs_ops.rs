use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::reorganize::phase_log::{PhaseLog, Status};

/// Guarded move and merge primitives shared by the mutating phases.
///
/// The same code path serves dry runs and real runs: only the actual filesystem
/// calls are skipped when not committing. Paths claimed and vacated during the run
/// are tracked so that later existence checks in a dry run agree with what a real
/// run would see at that point.
#[derive(Debug, Default)]
pub struct FsOps {
    commit: bool,
    claimed: HashSet<PathBuf>,
    vacated: Vec<PathBuf>,
    failures: usize,
}

/// Result of a single guarded move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    SourceMissing,
    DestinationExists,
    SelfMove,
    Failed,
}

/// Result of merging one folder into another.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub moved: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Source folder ended up empty and was removed.
    pub cleaned: bool,
}

impl FsOps {
    #[must_use]
    pub fn new(dry_run: bool) -> Self {
        Self {
            commit: !dry_run,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        !self.commit
    }

    /// Number of unanticipated I/O errors so far.
    #[must_use]
    pub const fn failures(&self) -> usize {
        self.failures
    }

    /// Check existence as seen by this run, including actions only simulated in a dry run.
    #[must_use]
    pub fn exists(&self, path: &Path) -> bool {
        if self.claimed.contains(path) {
            return true;
        }
        if self.vacated.iter().any(|vacated| path.starts_with(vacated)) {
            return false;
        }
        path.symlink_metadata().is_ok()
    }

    /// Create a directory with its parents. Only touches the filesystem when committing.
    ///
    /// A dry run fails the same way a real run would when a file is in the way.
    pub fn ensure_dir(&mut self, dir: &Path, log: &mut PhaseLog) -> bool {
        let result = if self.commit {
            fs::create_dir_all(dir).map_err(|error| error.to_string())
        } else {
            self.check_not_blocked(dir)
        };
        if let Err(error) = result {
            self.failures += 1;
            log.push(
                Status::Failed,
                format!("Failed to create directory {}: {error}", dir.display()),
            );
            return false;
        }
        self.claimed.insert(dir.to_path_buf());
        true
    }

    /// Same as [`Self::ensure_dir`], and logs the creation when the directory is new.
    pub fn create_dir(&mut self, dir: &Path, log: &mut PhaseLog) -> bool {
        let is_new = !self.exists(dir);
        if !self.ensure_dir(dir, log) {
            return false;
        }
        if is_new {
            log.push(Status::Create, format!("Create folder: {}", dir.display()));
        }
        true
    }

    /// Move a file or directory without ever overwriting.
    ///
    /// Skips with a warning when the source is missing or the destination exists,
    /// and refuses to move a directory into itself.
    pub fn safe_move(&mut self, source: &Path, destination: &Path, log: &mut PhaseLog) -> MoveOutcome {
        self.guarded_move(source, destination, Status::Move, log)
    }

    /// Same as [`Self::safe_move`] but logged as a rename into the staging area.
    pub fn stage_move(&mut self, source: &Path, destination: &Path, log: &mut PhaseLog) -> MoveOutcome {
        self.guarded_move(source, destination, Status::Stage, log)
    }

    /// Move every entry of `source_folder` into `destination_folder`,
    /// skipping names that already exist in the destination.
    ///
    /// The source folder is removed only if nothing was left behind.
    pub fn safe_merge(&mut self, source_folder: &Path, destination_folder: &Path, log: &mut PhaseLog) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        if !self.ensure_dir(destination_folder, log) {
            outcome.failed += 1;
            return outcome;
        }

        let entries = match self.list_entries(source_folder) {
            Ok(entries) => entries,
            Err(error) => {
                self.failures += 1;
                outcome.failed += 1;
                log.push(
                    Status::Failed,
                    format!("Failed to read {}: {error}", source_folder.display()),
                );
                return outcome;
            }
        };

        for entry in &entries {
            let Some(name) = entry.file_name() else {
                continue;
            };
            let destination_item = destination_folder.join(name);
            if self.exists(&destination_item) {
                log.push(
                    Status::Exists,
                    format!("Exists, skipped: {}", destination_item.display()),
                );
                outcome.skipped += 1;
                continue;
            }
            if self.transfer(entry, &destination_item, Status::Move, log) {
                outcome.moved += 1;
            } else {
                outcome.failed += 1;
            }
        }

        if outcome.moved == entries.len() {
            if self.remove_empty_dir(source_folder, log) {
                outcome.cleaned = true;
            } else {
                outcome.failed += 1;
            }
        } else {
            log.push(
                Status::LeftOver,
                format!(
                    "Left in place with {} unresolved item(s): {}",
                    entries.len() - outcome.moved,
                    source_folder.display()
                ),
            );
        }

        outcome
    }

    /// Remove a directory that has been emptied during this run.
    pub fn remove_empty_dir(&mut self, dir: &Path, log: &mut PhaseLog) -> bool {
        if self.commit
            && let Err(error) = fs::remove_dir(dir)
        {
            self.failures += 1;
            log.push(
                Status::Failed,
                format!("Failed to remove folder {}: {error}", dir.display()),
            );
            return false;
        }
        self.claimed.remove(dir);
        self.vacated.push(dir.to_path_buf());
        log.push(Status::Cleaned, format!("Cleaned empty folder: {}", dir.display()));
        true
    }

    fn guarded_move(&mut self, source: &Path, destination: &Path, status: Status, log: &mut PhaseLog) -> MoveOutcome {
        if !self.exists(source) {
            log.push(Status::Missing, format!("Missing: {}", source.display()));
            return MoveOutcome::SourceMissing;
        }
        if self.exists(destination) {
            log.push(Status::Exists, format!("Exists, skipped: {}", destination.display()));
            return MoveOutcome::DestinationExists;
        }
        if crate::is_subpath(destination, source) {
            log.push(
                Status::SelfMove,
                format!("Self-move blocked: {} → {}", source.display(), destination.display()),
            );
            return MoveOutcome::SelfMove;
        }
        if self.transfer(source, destination, status, log) {
            MoveOutcome::Moved
        } else {
            MoveOutcome::Failed
        }
    }

    /// Perform or simulate the move and log exactly one line for it.
    fn transfer(&mut self, source: &Path, destination: &Path, status: Status, log: &mut PhaseLog) -> bool {
        let result = if self.commit {
            destination
                .parent()
                .map_or(Ok(()), fs::create_dir_all)
                .and_then(|()| move_path(source, destination))
                .map_err(|error| error.to_string())
        } else {
            destination
                .parent()
                .map_or(Ok(()), |parent| self.check_not_blocked(parent))
        };
        if let Err(error) = result {
            self.failures += 1;
            log.push(
                Status::Failed,
                format!("Failed to move {}: {error}", source.display()),
            );
            return false;
        }
        let label = if status == Status::Stage { "Stage & Rename" } else { "Move" };
        log.push(
            status,
            format!("{label}: {} → {}", source.display(), destination.display()),
        );
        self.claimed.insert(destination.to_path_buf());
        self.claimed.remove(source);
        self.vacated.push(source.to_path_buf());
        true
    }

    /// Error if `dir` or one of its ancestors exists as something other than a directory.
    /// Ancestors moved away earlier in this run are ignored.
    fn check_not_blocked(&self, dir: &Path) -> Result<(), String> {
        let blocking = dir
            .ancestors()
            .filter(|ancestor| !self.vacated.iter().any(|vacated| ancestor.starts_with(vacated)))
            .find(|ancestor| ancestor.metadata().is_ok_and(|metadata| !metadata.is_dir()));
        match blocking {
            Some(file) => Err(format!("{} is not a directory", file.display())),
            None => Ok(()),
        }
    }

    /// Directory entries in name order, excluding ones already moved away in this run.
    fn list_entries(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !self.vacated.iter().any(|vacated| path.starts_with(vacated)) {
                entries.push(path);
            }
        }
        entries.sort();
        Ok(entries)
    }
}

/// Rename, falling back to copy and delete when crossing filesystems.
fn move_path(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::rename(source, destination) {
        Err(error) if error.kind() == io::ErrorKind::CrossesDevices => {
            if source.is_dir() {
                copy_dir_recursive(source, destination)?;
                fs::remove_dir_all(source)
            } else {
                fs::copy(source, destination)?;
                fs::remove_file(source)
            }
        }
        result => result,
    }
}

/// Recursively copy a directory and its contents.
fn copy_dir_recursive(source: &Path, target: &Path) -> io::Result<()> {
    fs::create_dir_all(target)?;

    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = target.join(entry.file_name());

        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod fs_ops_tests {
    use super::*;

    use tempfile::tempdir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn safe_move_moves_file_and_creates_parents() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("movie.mkv");
        let destination = dir.path().join("a").join("b").join("movie.mkv");
        write(&source, "data");

        let mut ops = FsOps::new(false);
        let mut log = PhaseLog::new();
        assert_eq!(ops.safe_move(&source, &destination, &mut log), MoveOutcome::Moved);
        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&destination).unwrap(), "data");
        assert_eq!(log.len(), 1);
        assert_eq!(log.count(Status::Move), 1);
    }

    #[test]
    fn safe_move_dry_run_does_not_touch_files() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("movie.mkv");
        let destination = dir.path().join("out").join("movie.mkv");
        write(&source, "data");

        let mut ops = FsOps::new(true);
        let mut log = PhaseLog::new();
        assert_eq!(ops.safe_move(&source, &destination, &mut log), MoveOutcome::Moved);
        assert!(source.exists());
        assert!(!destination.exists());
        assert!(!dir.path().join("out").exists());

        // The simulated move is visible to later checks in the same run
        assert!(ops.exists(&destination));
        assert!(!ops.exists(&source));
        assert_eq!(
            ops.safe_move(&source, &destination, &mut log),
            MoveOutcome::SourceMissing
        );
    }

    #[test]
    fn safe_move_skips_missing_source() {
        let dir = tempdir().unwrap();
        let mut ops = FsOps::new(false);
        let mut log = PhaseLog::new();
        let outcome = ops.safe_move(&dir.path().join("nope"), &dir.path().join("dest"), &mut log);
        assert_eq!(outcome, MoveOutcome::SourceMissing);
        assert_eq!(log.count(Status::Missing), 1);
        assert!(!dir.path().join("dest").exists());
    }

    #[test]
    fn safe_move_never_overwrites() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("new.mkv");
        let destination = dir.path().join("old.mkv");
        write(&source, "new");
        write(&destination, "old");

        let mut ops = FsOps::new(false);
        let mut log = PhaseLog::new();
        assert_eq!(
            ops.safe_move(&source, &destination, &mut log),
            MoveOutcome::DestinationExists
        );
        assert_eq!(fs::read_to_string(&destination).unwrap(), "old");
        assert!(source.exists());
        assert_eq!(log.count(Status::Exists), 1);
    }

    #[test]
    fn safe_move_blocks_moving_into_itself() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("Movie");
        fs::create_dir(&source).unwrap();
        let destination = source.join("nested").join("Movie");

        let mut ops = FsOps::new(false);
        let mut log = PhaseLog::new();
        assert_eq!(ops.safe_move(&source, &destination, &mut log), MoveOutcome::SelfMove);
        assert!(source.exists());
        assert!(!source.join("nested").exists());
        assert_eq!(log.count(Status::SelfMove), 1);
    }

    #[test]
    fn safe_merge_skips_conflicts_and_keeps_source() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("staging").join("Movie (2000)");
        let destination = dir.path().join("library").join("Movie (2000)");
        write(&source.join("Movie (2000).mkv"), "new video");
        write(&source.join("Movie (2000).srt"), "subs");
        write(&destination.join("Movie (2000).mkv"), "old video");

        let mut ops = FsOps::new(false);
        let mut log = PhaseLog::new();
        let outcome = ops.safe_merge(&source, &destination, &mut log);

        assert_eq!(outcome.moved, 1);
        assert_eq!(outcome.skipped, 1);
        assert!(!outcome.cleaned);
        assert_eq!(
            fs::read_to_string(destination.join("Movie (2000).mkv")).unwrap(),
            "old video"
        );
        assert!(destination.join("Movie (2000).srt").exists());
        assert!(source.join("Movie (2000).mkv").exists());
        assert_eq!(log.count(Status::Exists), 1);
        assert_eq!(log.count(Status::LeftOver), 1);
    }

    #[test]
    fn safe_merge_removes_emptied_source() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("staging").join("Movie (2000)");
        let destination = dir.path().join("library").join("Movie (2000)");
        write(&source.join("Movie (2000).mkv"), "video");
        write(&destination.join("poster.jpg"), "art");

        let mut ops = FsOps::new(false);
        let mut log = PhaseLog::new();
        let outcome = ops.safe_merge(&source, &destination, &mut log);

        assert_eq!(outcome.moved, 1);
        assert!(outcome.cleaned);
        assert!(!source.exists());
        assert!(destination.join("Movie (2000).mkv").exists());
        assert!(destination.join("poster.jpg").exists());
        assert_eq!(log.count(Status::Cleaned), 1);
    }

    #[test]
    fn safe_merge_dry_run_reports_cleanup_without_mutating() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("staging").join("Movie (2000)");
        let destination = dir.path().join("library").join("Movie (2000)");
        write(&source.join("Movie (2000).mkv"), "video");
        fs::create_dir_all(&destination).unwrap();

        let mut ops = FsOps::new(true);
        let mut log = PhaseLog::new();
        let outcome = ops.safe_merge(&source, &destination, &mut log);

        assert!(outcome.cleaned);
        assert!(source.join("Movie (2000).mkv").exists());
        assert!(!destination.join("Movie (2000).mkv").exists());
        assert_eq!(log.count(Status::Move), 1);
        assert_eq!(log.count(Status::Cleaned), 1);
    }

    #[test]
    fn merge_into_file_fails_in_dry_run_too() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("staged").join("Movie (2000)");
        let destination = dir.path().join("library").join("Movie (2000)");
        write(&source.join("movie.mkv"), "data");
        write(&destination, "not a folder");

        let mut dry_log = PhaseLog::new();
        let dry = FsOps::new(true).safe_merge(&source, &destination, &mut dry_log);
        let mut real_log = PhaseLog::new();
        let real = FsOps::new(false).safe_merge(&source, &destination, &mut real_log);

        assert_eq!(dry, real);
        assert_eq!(real.failed, 1);
        assert!(!real.cleaned);
        assert_eq!(dry_log.count(Status::Failed), 1);
        assert_eq!(real_log.count(Status::Failed), 1);
        assert!(!dry_log.has_changes());
        assert!(source.join("movie.mkv").is_file());
    }

    #[test]
    fn create_dir_logs_only_new_folders() {
        let dir = tempdir().unwrap();
        let existing = dir.path().join("existing");
        fs::create_dir(&existing).unwrap();

        let mut ops = FsOps::new(true);
        let mut log = PhaseLog::new();
        assert!(ops.create_dir(&existing, &mut log));
        assert!(ops.create_dir(&dir.path().join("new"), &mut log));
        assert_eq!(log.count(Status::Create), 1);
        assert!(!dir.path().join("new").exists());
    }
}
