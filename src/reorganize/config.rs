//! Configuration for the movie library reorganization.

use std::path::{Path, PathBuf};
use std::{fmt, fs};

use anyhow::Context;
use itertools::Itertools;
use serde::Deserialize;

use crate::reorganize::catalog::{Catalog, RenameMap};
use crate::reorganize::{DEFAULT_STAGING_DIR, UNCATEGORIZED_DIR};

/// Default source directory name inside the library base.
const DEFAULT_SOURCE_DIR: &str = "temp_movies";

/// Config from the `[moviesort]` section of the user config file.
#[derive(Debug, Default, Deserialize)]
pub struct MovieSortConfig {
    #[serde(default)]
    pub auto: bool,
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub dryrun: bool,
    #[serde(default)]
    pub no_log: bool,
    #[serde(default)]
    pub source_dir: Option<PathBuf>,
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
    #[serde(default)]
    pub uncategorized: Option<String>,
    #[serde(default)]
    pub utility_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub verbose: bool,
}

/// Whole user config file: settings plus the catalog and rename map.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    moviesort: MovieSortConfig,
    #[serde(default)]
    catalog: Catalog,
    #[serde(default)]
    rename: RenameMap,
}

/// Values given on the command line. These take precedence over the config file.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub base_dir: Option<PathBuf>,
    pub source_dir: Option<PathBuf>,
    pub staging_dir: Option<PathBuf>,
    pub auto: bool,
    pub debug: bool,
    pub dryrun: bool,
    pub json: bool,
    pub no_log: bool,
    pub verbose: bool,
}

/// Final config combined from CLI arguments and the user config file.
#[derive(Debug, Clone)]
pub struct LibraryConfig {
    pub base_dir: PathBuf,
    pub source_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub uncategorized: String,
    pub utility_dirs: Vec<PathBuf>,
    pub catalog: Catalog,
    pub rename_map: RenameMap,
    pub auto: bool,
    pub debug: bool,
    pub dryrun: bool,
    pub json: bool,
    pub log: bool,
    pub verbose: bool,
}

impl UserConfig {
    fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str::<Self>(toml_str).with_context(|| "Failed to parse config TOML")
    }

    /// Read the given config file, or the default one if it exists.
    ///
    /// An explicitly given file must exist, the default one is optional.
    fn read(config_file: Option<&Path>) -> anyhow::Result<Self> {
        let (path, required) = match config_file {
            Some(path) => (path, true),
            None => match crate::config::CONFIG_PATH.as_deref() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse config file {}:\n{e:#}", path.display())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound && !required => Ok(Self::default()),
            Err(error) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {error}",
                path.display()
            )),
        }
    }
}

impl MovieSortConfig {
    /// Parse the `[moviesort]` section from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        UserConfig::from_toml_str(toml_str).map(|config| config.moviesort)
    }
}

impl LibraryConfig {
    /// Config with default directories under `base_dir` and no rename entries.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>, catalog: Catalog) -> Self {
        let base_dir = base_dir.into();
        let source_dir = base_dir.join(DEFAULT_SOURCE_DIR);
        let staging_dir = source_dir.join(DEFAULT_STAGING_DIR);
        Self {
            base_dir,
            source_dir,
            staging_dir,
            uncategorized: UNCATEGORIZED_DIR.to_string(),
            utility_dirs: Vec::new(),
            catalog,
            rename_map: RenameMap::default(),
            auto: false,
            debug: false,
            dryrun: false,
            json: false,
            log: false,
            verbose: false,
        }
    }

    #[must_use]
    pub fn with_source_dir(mut self, source_dir: impl Into<PathBuf>) -> Self {
        self.source_dir = source_dir.into();
        self
    }

    #[must_use]
    pub fn with_staging_dir(mut self, staging_dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = staging_dir.into();
        self
    }

    #[must_use]
    pub fn with_rename_map(mut self, rename_map: RenameMap) -> Self {
        self.rename_map = rename_map;
        self
    }

    #[must_use]
    pub fn with_utility_dirs(mut self, utility_dirs: Vec<PathBuf>) -> Self {
        self.utility_dirs = utility_dirs;
        self
    }

    /// Create config from given command line args and user config file.
    ///
    /// # Errors
    /// Returns an error if the config file cannot be read or parsed,
    /// or if no library base directory is configured.
    pub fn from_args(overrides: ConfigOverrides) -> anyhow::Result<Self> {
        let user_config = UserConfig::read(overrides.config_file.as_deref())?;
        Self::combine(user_config, overrides)
    }

    /// Create config from a TOML string and command line args.
    ///
    /// # Errors
    /// Returns an error if the TOML is invalid or no library base directory is configured.
    pub fn from_toml_str(toml_str: &str, overrides: ConfigOverrides) -> anyhow::Result<Self> {
        Self::combine(UserConfig::from_toml_str(toml_str)?, overrides)
    }

    fn combine(user_config: UserConfig, overrides: ConfigOverrides) -> anyhow::Result<Self> {
        let UserConfig {
            moviesort: settings,
            catalog,
            rename,
        } = user_config;

        let Some(base_dir) = overrides.base_dir.or(settings.base_dir) else {
            anyhow::bail!(
                "No library base directory configured: set `base_dir` in the [moviesort] section of {} or use --base",
                crate::config::CONFIG_PATH
                    .as_deref()
                    .map_or_else(|| "the config file".to_string(), |path| path.display().to_string())
            );
        };
        let base_dir = crate::absolute_path(&base_dir);

        // Paths given on the command line are relative to the working directory,
        // paths from the config file to the library base.
        let source_dir = overrides
            .source_dir
            .map(|dir| crate::absolute_path(&dir))
            .or_else(|| settings.source_dir.map(|dir| resolve_under(&base_dir, &dir)))
            .unwrap_or_else(|| base_dir.join(DEFAULT_SOURCE_DIR));

        let staging_dir = overrides
            .staging_dir
            .map(|dir| crate::absolute_path(&dir))
            .or_else(|| settings.staging_dir.map(|dir| resolve_under(&base_dir, &dir)))
            .unwrap_or_else(|| source_dir.join(DEFAULT_STAGING_DIR));

        let uncategorized = settings
            .uncategorized
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNCATEGORIZED_DIR.to_string());

        let utility_dirs = settings
            .utility_dirs
            .iter()
            .map(|dir| resolve_under(&base_dir, dir))
            .unique()
            .collect();

        Ok(Self {
            base_dir,
            source_dir,
            staging_dir,
            uncategorized,
            utility_dirs,
            catalog,
            rename_map: rename,
            auto: overrides.auto || settings.auto,
            debug: overrides.debug || settings.debug,
            dryrun: overrides.dryrun || settings.dryrun,
            json: overrides.json,
            log: !(overrides.no_log || settings.no_log),
            verbose: overrides.verbose || settings.verbose,
        })
    }

    /// Fallback directory for titles missing from the catalog.
    #[must_use]
    pub fn uncategorized_dir(&self) -> PathBuf {
        self.base_dir.join(&self.uncategorized)
    }

    /// Directories ignored entirely by validation.
    ///
    /// Derived from the same settings the phases use, so the staging and source
    /// folders are covered automatically when they live inside the library.
    #[must_use]
    pub fn allowed_dirs(&self) -> Vec<PathBuf> {
        [&self.staging_dir, &self.source_dir]
            .into_iter()
            .chain(self.utility_dirs.iter())
            .filter(|dir| dir.starts_with(&self.base_dir) && **dir != self.base_dir)
            .cloned()
            .unique()
            .collect()
    }
}

/// Relative paths are taken relative to the library base.
fn resolve_under(base_dir: &Path, dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        crate::absolute_path(dir)
    } else {
        crate::absolute_path(&base_dir.join(dir))
    }
}

impl fmt::Display for LibraryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let utility_dirs = if self.utility_dirs.is_empty() {
            "utility dirs:  []".to_string()
        } else {
            "utility dirs:\n".to_string()
                + &*self
                    .utility_dirs
                    .iter()
                    .map(|dir| format!("    {}", dir.display()))
                    .join("\n")
        };
        writeln!(f, "Config:")?;
        writeln!(f, "  base:          {}", self.base_dir.display())?;
        writeln!(f, "  source:        {}", self.source_dir.display())?;
        writeln!(f, "  staging:       {}", self.staging_dir.display())?;
        writeln!(f, "  uncategorized: {}", self.uncategorized)?;
        writeln!(f, "  categories:    {}", self.catalog.len())?;
        writeln!(f, "  titles:        {}", self.catalog.title_count())?;
        writeln!(f, "  renames:       {}", self.rename_map.len())?;
        writeln!(f, "  auto:          {}", crate::colorize_bool(self.auto))?;
        writeln!(f, "  dryrun:        {}", crate::colorize_bool(self.dryrun))?;
        writeln!(f, "  log:           {}", crate::colorize_bool(self.log))?;
        writeln!(f, "  verbose:       {}", crate::colorize_bool(self.verbose))?;
        writeln!(f, "  {utility_dirs}")
    }
}
