use std::fmt;

use colored::{ColoredString, Colorize};

/// Outcome category of a single log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// A file or directory was (or would be) moved.
    Move,
    /// A file was (or would be) renamed into its staging title folder.
    Stage,
    /// Move source does not exist.
    Missing,
    /// Move or merge destination exists and was left untouched.
    Exists,
    /// Staging destination for a rename entry is already present.
    AlreadyExists,
    /// Destination is nested inside the source.
    SelfMove,
    /// No file matched a rename entry.
    NotFound,
    /// More than one file matched a rename entry.
    Ambiguous,
    /// Title is not in the catalog and goes to the fallback bucket.
    Uncategorized,
    /// Merge source folder was emptied and removed.
    Cleaned,
    /// A directory that must exist was (or would be) created.
    Create,
    /// Merge source folder still has conflicting entries.
    LeftOver,
    /// Unanticipated I/O error for a single item.
    Failed,
    /// Expected title directory does not exist.
    MissingTitle,
    /// Directory not accounted for by the catalog or the allow-list.
    Unexpected,
    Info,
    Summary,
}

impl Status {
    #[must_use]
    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Move | Self::Stage => "➡️ ",
            Self::Missing | Self::Exists | Self::AlreadyExists | Self::LeftOver | Self::Unexpected => "⚠️ ",
            Self::SelfMove => "🚫",
            Self::NotFound | Self::Failed | Self::MissingTitle => "❌",
            Self::Ambiguous => "❗",
            Self::Uncategorized => "📦",
            Self::Cleaned => "🧹",
            Self::Create => "📁",
            Self::Info => "ℹ️ ",
            Self::Summary => "📊",
        }
    }

    /// True for lines that need the user's attention.
    #[must_use]
    pub const fn is_problem(self) -> bool {
        matches!(
            self,
            Self::Missing
                | Self::Exists
                | Self::AlreadyExists
                | Self::SelfMove
                | Self::NotFound
                | Self::Ambiguous
                | Self::LeftOver
                | Self::Failed
                | Self::MissingTitle
                | Self::Unexpected
        )
    }

    fn colorize(self, text: &str) -> ColoredString {
        match self {
            Self::Move | Self::Stage | Self::Cleaned | Self::Create => text.green(),
            Self::Failed | Self::SelfMove | Self::MissingTitle | Self::NotFound => text.red(),
            Self::Uncategorized => text.cyan(),
            Self::Summary => text.bold(),
            Self::Info => text.normal(),
            _ => text.yellow(),
        }
    }
}

/// One human-readable status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub status: Status,
    pub message: String,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status.emoji(), self.message)
    }
}

/// Ordered log produced by one phase run.
#[derive(Debug, Clone, Default)]
pub struct PhaseLog {
    lines: Vec<LogLine>,
}

impl PhaseLog {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    pub fn push(&mut self, status: Status, message: impl Into<String>) {
        self.lines.push(LogLine {
            status,
            message: message.into(),
        });
    }

    #[must_use]
    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    /// Number of lines with the given status.
    #[must_use]
    pub fn count(&self, status: Status) -> usize {
        self.lines.iter().filter(|line| line.status == status).count()
    }

    #[must_use]
    pub fn contains(&self, status: Status) -> bool {
        self.lines.iter().any(|line| line.status == status)
    }

    /// True if the log records any change to the filesystem, planned or done.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.lines
            .iter()
            .any(|line| matches!(line.status, Status::Move | Status::Stage | Status::Cleaned | Status::Create))
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Print all lines to stdout with colours.
    pub fn print(&self) {
        for line in &self.lines {
            println!("{} {}", line.status.emoji(), line.status.colorize(&line.message));
        }
    }
}

impl fmt::Display for PhaseLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
