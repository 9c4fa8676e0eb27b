pub mod config;
pub mod reorganize;

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Command;
use clap_complete::Shell;
use colored::{ColoredString, Colorize};
use difference::{Changeset, Difference};
use unicode_normalization::UnicodeNormalization;

/// Format bool value as a coloured string.
#[must_use]
pub fn colorize_bool(value: bool) -> ColoredString {
    if value { "true".green() } else { "false".red() }
}

/// Normalize a file name to Unicode NFC so that names typed in config files
/// compare equal to names read from disk.
///
/// Some filesystems (macOS) store names decomposed (NFD),
/// which turns "å" into "a\u{30a}" and breaks plain string equality.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.nfc().collect::<String>()
}

/// Get the NFC-normalized file name of a path.
#[must_use]
pub fn get_normalized_file_name(path: &Path) -> String {
    normalize_name(&path_to_filename_string(path))
}

/// Check if entry is a hidden file or directory (starts with '.')
#[must_use]
pub fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    let name_bytes = entry.file_name().as_encoded_bytes();
    !name_bytes.is_empty() && name_bytes[0] == b'.'
}

/// Turn a possibly relative path into an absolute one without requiring it to exist.
///
/// The deepest existing ancestor is canonicalized and the remaining components are appended,
/// so `/srv/media/../media/new/dir` resolves even when `new/dir` has not been created yet.
///
/// ```rust
/// use std::path::Path;
/// use movie_sort::absolute_path;
///
/// let path = absolute_path(Path::new("src/not-created-yet"));
/// assert!(path.is_absolute());
/// assert!(path.ends_with("src/not-created-yet"));
/// ```
#[must_use]
pub fn absolute_path(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };

    let mut existing = joined.as_path();
    let mut remainder: Vec<&OsStr> = Vec::new();
    loop {
        if let Ok(canonical) = dunce::canonicalize(existing) {
            return remainder.iter().rev().fold(canonical, |acc, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                remainder.push(name);
                existing = parent;
            }
            _ => return dunce::simplified(&joined).to_path_buf(),
        }
    }
}

/// Check if `path` is the same as or nested inside `parent`.
/// Both paths are resolved first, so relative paths and symlinked roots compare correctly.
#[must_use]
pub fn is_subpath(path: &Path, parent: &Path) -> bool {
    absolute_path(path).starts_with(absolute_path(parent))
}

/// Convert `OsStr` to String with invalid Unicode handling.
pub fn os_str_to_string(name: &OsStr) -> String {
    name.to_str().map_or_else(
        || name.to_string_lossy().replace('\u{FFFD}', ""),
        std::string::ToString::to_string,
    )
}

/// Convert given path to string with invalid Unicode handling.
pub fn path_to_string(path: &Path) -> String {
    path.to_str().map_or_else(
        || path.to_string_lossy().to_string().replace('\u{FFFD}', ""),
        std::string::ToString::to_string,
    )
}

/// Convert given path to filename string with invalid Unicode handling.
#[must_use]
pub fn path_to_filename_string(path: &Path) -> String {
    os_str_to_string(path.file_name().unwrap_or_default())
}

/// Convert given path to file stem string with invalid Unicode handling.
#[must_use]
pub fn path_to_file_stem_string(path: &Path) -> String {
    os_str_to_string(path.file_stem().unwrap_or_default())
}

#[inline]
pub fn print_error(message: &str) {
    eprintln!("{}", format!("Error: {message}").red());
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        $crate::print_error(&format!($($arg)*))
    };
}

#[inline]
pub fn print_warning(message: &str) {
    eprintln!("{}", message.yellow());
}

#[macro_export]
macro_rules! print_warning {
    ($($arg:tt)*) => {
        $crate::print_warning(&format!($($arg)*))
    };
}

#[inline]
pub fn print_bold(message: &str) {
    println!("{}", message.bold());
}

#[macro_export]
macro_rules! print_bold {
    ($($arg:tt)*) => {
        $crate::print_bold(&format!($($arg)*))
    };
}

/// Coloured old and new file name, padded so that the first common part lines up:
///
/// ```text
/// Alien.1979.Directors.Cut.mkv
///      Alien (1979).mkv
/// ```
pub fn color_rename_diff(old: &str, new: &str) -> (String, String) {
    let changeset = Changeset::new(old, new, "");

    let anchor = changeset.diffs.iter().find_map(|diff| match diff {
        Difference::Same(common) if common.trim().chars().count() >= 3 => {
            Some((old.find(common.as_str())?, new.find(common.as_str())?))
        }
        _ => None,
    });
    let (mut old_diff, mut new_diff) = match anchor {
        Some((old_index, new_index)) => (
            " ".repeat(new_index.saturating_sub(old_index)),
            " ".repeat(old_index.saturating_sub(new_index)),
        ),
        None => (String::new(), String::new()),
    };

    for diff in &changeset.diffs {
        match diff {
            Difference::Same(common) => {
                old_diff.push_str(common);
                new_diff.push_str(common);
            }
            Difference::Add(added) => {
                let added = if added.trim().is_empty() { added.on_green() } else { added.green() };
                new_diff.push_str(&added.to_string());
            }
            Difference::Rem(removed) => {
                let removed = if removed.trim().is_empty() { removed.on_red() } else { removed.red() };
                old_diff.push_str(&removed.to_string());
            }
        }
    }

    (old_diff, new_diff)
}

/// Print the old and new name stacked on two lines.
pub fn show_diff(old: &str, new: &str) {
    let (old_diff, new_diff) = color_rename_diff(old, new);
    println!("  {old_diff}");
    if old != new {
        println!("  {new_diff}");
    }
}

/// Generate a shell completion script for the given shell.
pub fn generate_shell_completion(shell: Shell, mut command: Command, install: bool, command_name: &str) -> Result<()> {
    if install {
        let out_dir = get_shell_completion_dir(shell)?;
        let path = clap_complete::generate_to(shell, &mut command, command_name, out_dir)?;
        println!("Completion file generated to: {}", path.display());
    } else {
        clap_complete::generate(shell, &mut command, command_name, &mut std::io::stdout());
    }
    Ok(())
}

/// Directory for installed completion files.
///
/// Prefers an existing user directory, then an existing system directory,
/// and otherwise creates the user directory.
fn get_shell_completion_dir(shell: Shell) -> Result<PathBuf> {
    let Some(home) = dirs::home_dir() else {
        anyhow::bail!("Failed to get home directory");
    };

    let (user_dir, system_dir) = match shell {
        Shell::Bash => (home.join(".bash_completion.d"), Some("/etc/bash_completion.d")),
        Shell::Fish => (
            home.join(".config/fish/completions"),
            Some("/usr/share/fish/completions"),
        ),
        Shell::Zsh => (home.join(".zsh/completions"), Some("/usr/share/zsh/site-functions")),
        Shell::PowerShell => (home.join(".config/powershell/completions"), None),
        _ => anyhow::bail!("Unsupported shell: {shell}"),
    };

    if user_dir.exists() {
        return Ok(user_dir);
    }
    if let Some(system_dir) = system_dir.map(PathBuf::from)
        && system_dir.exists()
    {
        return Ok(system_dir);
    }

    std::fs::create_dir_all(&user_dir)?;
    Ok(user_dir)
}
