use std::fs;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use crate::reorganize::config::LibraryConfig;
use crate::reorganize::phase_log::PhaseLog;
use crate::reorganize::validate::ValidationReport;

/// Simple file logger recording committed phases with buffered writes.
pub struct FileLogger {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileLogger {
    /// Create a new file logger, writing to `~/logs/movie-sort/moviesort_<timestamp>.log`
    ///
    /// # Errors
    /// Returns an error if the log directory or file cannot be created.
    pub fn new() -> Result<Self> {
        let log_dir = crate::config::LOG_DIR
            .as_deref()
            .context("Failed to get home directory")?;
        Self::in_dir(log_dir)
    }

    /// Create a new file logger in the given directory.
    ///
    /// # Errors
    /// Returns an error if the directory or file cannot be created.
    pub fn in_dir(log_dir: &Path) -> Result<Self> {
        if !log_dir.exists() {
            fs::create_dir_all(log_dir).context("Failed to create log directory")?;
        }

        let path = log_dir.join(format!("moviesort_{}.log", Local::now().format("%Y-%m-%d_%H-%M-%S")));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to create log file: {}", path.display()))?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn timestamp() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Log when starting the program
    pub fn log_init(&mut self, config: &LibraryConfig) {
        let _ = writeln!(
            self.writer,
            "[{}] INIT \"{}\"",
            Self::timestamp(),
            config.base_dir.display()
        );
        let _ = writeln!(self.writer, "  source_dir: {}", config.source_dir.display());
        let _ = writeln!(self.writer, "  staging_dir: {}", config.staging_dir.display());
        let _ = writeln!(self.writer, "  uncategorized: {}", config.uncategorized);
        let _ = writeln!(self.writer, "  categories: {}", config.catalog.len());
        let _ = writeln!(self.writer, "  titles: {}", config.catalog.title_count());
        let _ = writeln!(self.writer, "  renames: {}", config.rename_map.len());
        if !config.utility_dirs.is_empty() {
            let _ = writeln!(self.writer, "  utility_dirs: {:?}", config.utility_dirs);
        }
        let _ = self.writer.flush();
    }

    /// Log every line of a committed phase.
    pub fn log_phase(&mut self, phase: &str, log: &PhaseLog) {
        let _ = writeln!(self.writer, "[{}] START {phase}", Self::timestamp());
        for line in log.lines() {
            let _ = writeln!(self.writer, "  {line}");
        }
        let _ = writeln!(self.writer, "[{}] END   {phase}", Self::timestamp());
        let _ = self.writer.flush();
    }

    /// Log a phase that was not confirmed.
    pub fn log_skipped(&mut self, phase: &str) {
        let _ = writeln!(self.writer, "[{}] SKIP  {phase}", Self::timestamp());
        let _ = self.writer.flush();
    }

    /// Log the validation result
    pub fn log_validation(&mut self, report: &ValidationReport) {
        let _ = writeln!(
            self.writer,
            "[{}] VALIDATE \"{}\" | Missing: {} | Unexpected: {}",
            Self::timestamp(),
            report.base.display(),
            report.missing.len(),
            report.unexpected.len()
        );
        for line in report.log.lines() {
            let _ = writeln!(self.writer, "  {line}");
        }
        let _ = writeln!(self.writer, "[{}] END", Self::timestamp());
        let _ = self.writer.flush();
    }
}

#[cfg(test)]
mod logger_tests {
    use super::*;

    use tempfile::tempdir;

    use crate::reorganize::phase_log::Status;

    #[test]
    fn writes_phase_lines_to_file() {
        let dir = tempdir().unwrap();
        let mut logger = FileLogger::in_dir(&dir.path().join("logs")).unwrap();

        let mut log = PhaseLog::new();
        log.push(Status::Move, "Move: a → b");
        logger.log_phase("Phase B", &log);
        logger.log_skipped("Phase A");

        let content = fs::read_to_string(logger.path()).unwrap();
        assert!(content.contains("START Phase B"));
        assert!(content.contains("Move: a → b"));
        assert!(content.contains("SKIP  Phase A"));
    }
}
