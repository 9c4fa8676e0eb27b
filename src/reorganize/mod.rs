//! Movie library reorganization.
//!
//! Three phases run in order, each of them independently as well:
//! rename and stage mis-named files, sort the staged title folders into
//! the catalog's category directories, and validate the resulting library.
//! Mutating phases share the move and merge primitives in [`FsOps`],
//! which run the same code path for dry runs and real runs.

mod catalog;
mod config;
mod fs_ops;
mod library;
mod logger;
mod phase_log;
mod pipeline;
mod prompt;
mod stage;
mod validate;

pub use catalog::{Catalog, RenameMap, RenameWarning};
pub use config::{ConfigOverrides, LibraryConfig, MovieSortConfig};
pub use fs_ops::{FsOps, MergeOutcome, MoveOutcome};
pub use library::{SortSummary, sort_staged};
pub use logger::FileLogger;
pub use phase_log::{LogLine, PhaseLog, Status};
pub use pipeline::{MovieSort, SessionSummary};
pub use prompt::{AutoConfirm, Confirm, ScriptedConfirm, StdinPrompt, parse_answer};
pub use stage::{StageSummary, stage_files};
pub use validate::{ValidationReport, validate_library};

/// Fallback category directory name for titles missing from the catalog.
pub const UNCATEGORIZED_DIR: &str = "_Uncategorized";

/// Default staging directory name inside the source directory.
pub const DEFAULT_STAGING_DIR: &str = "renamed";
