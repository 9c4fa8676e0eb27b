use anyhow::Result;

use crate::reorganize::config::{ConfigOverrides, LibraryConfig};
use crate::reorganize::library::{SortSummary, sort_staged};
use crate::reorganize::logger::FileLogger;
use crate::reorganize::phase_log::{PhaseLog, Status};
use crate::reorganize::prompt::Confirm;
use crate::reorganize::stage::{StageSummary, stage_files};
use crate::reorganize::validate::{ValidationReport, validate_library};
use crate::{print_bold, print_error, print_warning};

/// Runs the reorganization phases for one library.
pub struct MovieSort {
    config: LibraryConfig,
    logger: Option<FileLogger>,
}

/// What happened in a full A → B → C session.
///
/// A phase result is `None` when its real run was skipped.
#[derive(Debug)]
pub struct SessionSummary {
    pub stage: Option<StageSummary>,
    pub sort: Option<SortSummary>,
    pub validation: ValidationReport,
}

impl SessionSummary {
    /// Number of mutating phases that were executed for real.
    #[must_use]
    pub fn executed_phases(&self) -> usize {
        usize::from(self.stage.is_some()) + usize::from(self.sort.is_some())
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Stage,
    Sort,
}

impl Phase {
    const fn name(self) -> &'static str {
        match self {
            Self::Stage => "Phase A",
            Self::Sort => "Phase B",
        }
    }

    const fn title(self) -> &'static str {
        match self {
            Self::Stage => "PHASE A: RENAME & STAGE",
            Self::Sort => "PHASE B: MOVE STAGED → LIBRARY",
        }
    }
}

/// Common view of the mutating phase results.
trait PhaseResult {
    fn log(&self) -> &PhaseLog;

    fn print(&self, _verbose: bool) {
        self.log().print();
    }
}

impl PhaseResult for StageSummary {
    fn log(&self) -> &PhaseLog {
        &self.log
    }

    fn print(&self, verbose: bool) {
        if verbose {
            for (old_name, new_name) in &self.renames {
                crate::show_diff(old_name, new_name);
            }
        }
        self.log.print();
    }
}

impl PhaseResult for SortSummary {
    fn log(&self) -> &PhaseLog {
        &self.log
    }
}

impl MovieSort {
    #[must_use]
    pub const fn new(config: LibraryConfig) -> Self {
        Self { config, logger: None }
    }

    /// Build from the user config file and command line overrides.
    ///
    /// The run log file is opened unless logging is disabled or this is a print-only run.
    /// Failing to create it is a warning, not an error.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be read or resolved.
    pub fn from_args(overrides: ConfigOverrides) -> Result<Self> {
        let config = LibraryConfig::from_args(overrides)?;
        let enable_log = config.log && !config.dryrun;
        let movie_sort = Self::new(config);
        if !enable_log {
            return Ok(movie_sort);
        }
        match FileLogger::new() {
            Ok(logger) => Ok(movie_sort.with_file_logger(logger)),
            Err(error) => {
                print_warning!("Run log disabled: {error:#}");
                Ok(movie_sort)
            }
        }
    }

    /// Record committed phases in the given log file.
    #[must_use]
    pub fn with_file_logger(mut self, mut logger: FileLogger) -> Self {
        logger.log_init(&self.config);
        self.logger = Some(logger);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// Print warnings about suspicious rename entries and duplicate catalog titles.
    pub fn print_config_warnings(&self) {
        for warning in self.config.rename_map.lint() {
            print_warning!("{warning}");
        }
        for (title, categories) in self.config.catalog.duplicate_titles() {
            print_warning!("Title listed in several categories: {title} ({})", categories.join(", "));
        }
    }

    /// Phase A without any prompting.
    #[must_use]
    pub fn stage(&self, dry_run: bool) -> StageSummary {
        stage_files(
            &self.config.rename_map,
            &self.config.source_dir,
            &self.config.staging_dir,
            dry_run,
        )
    }

    /// Phase B without any prompting.
    #[must_use]
    pub fn sort(&self, dry_run: bool) -> SortSummary {
        sort_staged(
            &self.config.staging_dir,
            &self.config.base_dir,
            &self.config.catalog,
            &self.config.uncategorized,
            dry_run,
        )
    }

    /// Phase C. Never modifies the filesystem.
    #[must_use]
    pub fn validate(&self) -> ValidationReport {
        validate_library(
            &self.config.base_dir,
            &self.config.catalog,
            &self.config.allowed_dirs(),
            &self.config.uncategorized,
        )
    }

    /// Dry run Phase A, then run it for real if confirmed.
    ///
    /// # Errors
    /// Returns an error if reading the confirmation fails.
    pub fn run_stage(&mut self, confirm: &mut dyn Confirm) -> Result<Option<StageSummary>> {
        self.gated(Phase::Stage, confirm, |this, dry_run| this.stage(dry_run))
    }

    /// Dry run Phase B, then run it for real if confirmed.
    ///
    /// # Errors
    /// Returns an error if reading the confirmation fails.
    pub fn run_sort(&mut self, confirm: &mut dyn Confirm) -> Result<Option<SortSummary>> {
        self.gated(Phase::Sort, confirm, |this, dry_run| this.sort(dry_run))
    }

    /// Run Phase C and print the report, as JSON if requested.
    ///
    /// # Errors
    /// Returns an error if the report cannot be serialized.
    pub fn run_validate(&mut self) -> Result<ValidationReport> {
        let report = self.validate();
        if self.config.json {
            println!("{}", report.to_json()?);
        } else {
            println!();
            print_bold!("=== PHASE C: VALIDATE LIBRARY ===");
            report.log.print();
        }
        if let Some(logger) = self.logger.as_mut() {
            logger.log_validation(&report);
        }
        Ok(report)
    }

    /// Run all phases in order, each mutating phase behind its own confirmation.
    ///
    /// # Errors
    /// Returns an error if reading a confirmation fails.
    pub fn run_all(&mut self, confirm: &mut dyn Confirm) -> Result<SessionSummary> {
        let stage = self.run_stage(confirm)?;
        let sort = self.run_sort(confirm)?;
        let validation = self.run_validate()?;
        if !self.config.json {
            println!("\n✅ All phases complete");
        }
        Ok(SessionSummary {
            stage,
            sort,
            validation,
        })
    }

    /// Print the dry run, ask, then repeat the same phase with commit enabled.
    fn gated<T: PhaseResult>(
        &mut self,
        phase: Phase,
        confirm: &mut dyn Confirm,
        run: impl Fn(&Self, bool) -> T,
    ) -> Result<Option<T>> {
        println!();
        print_bold!("=== {} (Dry Run) ===", phase.title());
        let preview = run(&*self, true);
        preview.print(self.config.verbose);

        if self.config.dryrun {
            return Ok(None);
        }
        if !preview.log().has_changes() {
            println!("Nothing to do for {}.", phase.name());
            return Ok(None);
        }
        if !confirm.confirm(&format!("Execute {} for real?", phase.name()))? {
            println!("⏭️  Skipped actual {} execution.", phase.name());
            if let Some(logger) = self.logger.as_mut() {
                logger.log_skipped(phase.name());
            }
            return Ok(None);
        }

        println!();
        print_bold!("=== Running {} ===", phase.title());
        let result = run(&*self, false);
        result.print(self.config.verbose);
        let failed = result.log().count(Status::Failed);
        if failed > 0 {
            print_error!("{failed} item(s) failed in {}", phase.name());
        }
        if let Some(logger) = self.logger.as_mut() {
            logger.log_phase(phase.title(), result.log());
        }
        Ok(Some(result))
    }
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;

    use std::collections::BTreeMap;
    use std::fs;
    use std::path::Path;

    use tempfile::tempdir;

    use crate::reorganize::catalog::{Catalog, RenameMap};
    use crate::reorganize::prompt::{AutoConfirm, ScriptedConfirm};

    fn library(base: &Path) -> LibraryConfig {
        let mut categories = BTreeMap::new();
        categories.insert("Horror".to_string(), vec!["The Thing (1982)".to_string()]);
        LibraryConfig::new(base, Catalog::new(categories))
            .with_rename_map(RenameMap::new([("the.thing.1982.mkv", "The Thing (1982).mkv")]))
    }

    fn seed(base: &Path) {
        let downloads = base.join("temp_movies").join("downloads");
        fs::create_dir_all(&downloads).unwrap();
        fs::write(downloads.join("the.thing.1982.mkv"), "movie").unwrap();
    }

    #[test]
    fn auto_confirm_runs_every_phase() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        seed(base);

        let mut movie_sort = MovieSort::new(library(base));
        let summary = movie_sort.run_all(&mut AutoConfirm(true)).unwrap();

        assert_eq!(summary.executed_phases(), 2);
        assert_eq!(summary.stage.as_ref().map(|s| s.staged), Some(1));
        assert_eq!(summary.sort.as_ref().map(|s| s.moved), Some(1));
        assert!(summary.validation.is_clean(), "{:?}", summary.validation);
        assert!(
            base.join("Horror")
                .join("The Thing (1982)")
                .join("The Thing (1982).mkv")
                .is_file()
        );
    }

    #[test]
    fn declined_phase_leaves_files_untouched() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        seed(base);

        let mut movie_sort = MovieSort::new(library(base));
        let mut confirm = ScriptedConfirm::new([false]);
        let summary = movie_sort.run_all(&mut confirm).unwrap();

        assert_eq!(summary.executed_phases(), 0);
        // Phase B still plans the uncategorized bucket
        assert_eq!(
            confirm.questions,
            vec!["Execute Phase A for real?", "Execute Phase B for real?"]
        );
        assert!(!base.join("_Uncategorized").exists());
        assert!(base.join("temp_movies").join("downloads").join("the.thing.1982.mkv").is_file());
        assert_eq!(summary.validation.missing.len(), 1);
    }

    #[test]
    fn print_only_never_prompts() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        seed(base);

        let mut config = library(base);
        config.dryrun = true;
        let mut movie_sort = MovieSort::new(config);
        let mut confirm = ScriptedConfirm::new([true, true]);
        let summary = movie_sort.run_all(&mut confirm).unwrap();

        assert!(confirm.questions.is_empty());
        assert_eq!(summary.executed_phases(), 0);
        assert!(!base.join("temp_movies").join("renamed").exists());
    }

    #[test]
    fn nothing_to_do_skips_prompt() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        fs::create_dir_all(base.join("Horror").join("The Thing (1982)")).unwrap();
        fs::create_dir_all(base.join("_Uncategorized")).unwrap();

        let mut movie_sort = MovieSort::new(library(base));
        let mut confirm = ScriptedConfirm::default();
        let summary = movie_sort.run_all(&mut confirm).unwrap();

        assert!(confirm.questions.is_empty());
        assert!(summary.validation.is_clean());
    }

    #[test]
    fn sort_creates_bucket_without_staged_titles() {
        let dir = tempdir().unwrap();
        let base = dir.path();

        let mut movie_sort = MovieSort::new(library(base));
        let sorted = movie_sort.run_sort(&mut AutoConfirm(true)).unwrap();

        assert!(sorted.is_some());
        assert!(base.join("_Uncategorized").is_dir());
    }

    #[test]
    fn stage_then_sort_step_by_step() {
        let dir = tempdir().unwrap();
        let base = dir.path();
        seed(base);

        let mut movie_sort = MovieSort::new(library(base));
        let mut confirm = ScriptedConfirm::new([true, true]);

        let staged = movie_sort.run_stage(&mut confirm).unwrap().unwrap();
        assert!(staged.log.contains(Status::Stage));
        assert!(
            base.join("temp_movies")
                .join("renamed")
                .join("The Thing (1982)")
                .join("The Thing (1982).mkv")
                .is_file()
        );

        let sorted = movie_sort.run_sort(&mut confirm).unwrap().unwrap();
        assert_eq!(sorted.moved, 1);
        assert!(!base.join("temp_movies").join("renamed").exists());
        assert_eq!(confirm.questions, vec!["Execute Phase A for real?", "Execute Phase B for real?"]);
    }

    #[test]
    fn committed_phases_are_written_to_run_log() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("library");
        seed(&base);

        let logger = FileLogger::in_dir(&dir.path().join("logs")).unwrap();
        let log_path = logger.path().to_path_buf();
        let mut movie_sort = MovieSort::new(library(&base)).with_file_logger(logger);
        movie_sort.run_all(&mut ScriptedConfirm::new([true, false])).unwrap();
        drop(movie_sort);

        let content = fs::read_to_string(log_path).unwrap();
        assert!(content.contains("INIT"));
        assert!(content.contains("START PHASE A: RENAME & STAGE"));
        assert!(content.contains("SKIP  Phase B"));
        assert!(content.contains("VALIDATE"));
    }
}
