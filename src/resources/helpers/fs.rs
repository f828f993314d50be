//! File-system resource helpers.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create parent: {}", parent.display()))?;
    }
    Ok(())
}

/// Expand a leading `~` (or `~/`) against `home`. Other paths are returned
/// unchanged.
#[must_use]
pub fn expand_home(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        return home.to_path_buf();
    }
    path.strip_prefix("~/")
        .or_else(|| path.strip_prefix("~\\"))
        .map_or_else(|| PathBuf::from(path), |rest| home.join(rest))
}

/// Backup path for `path` using timestamp `stamp`: `<name>.bak.<stamp>`,
/// with `.1`, `.2`, … appended when that name is already taken.
#[must_use]
pub fn backup_path(path: &Path, stamp: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = path.with_file_name(format!("{name}.bak.{stamp}"));
    if base.symlink_metadata().is_err() {
        return base;
    }
    (1..=9999u32)
        .map(|n| path.with_file_name(format!("{name}.bak.{stamp}.{n}")))
        .find(|p| p.symlink_metadata().is_err())
        .unwrap_or(base)
}

/// Copy `path` to a fresh timestamped backup next to it.
///
/// # Errors
///
/// Returns an error if the copy fails.
pub fn backup_file(path: &Path) -> Result<PathBuf> {
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();
    let backup = backup_path(path, &stamp);
    std::fs::copy(path, &backup)
        .with_context(|| format!("backing up {} to {}", path.display(), backup.display()))?;
    Ok(backup)
}

/// Write `content` to `path`, backing up an existing file first.
///
/// Returns the backup path when one was taken.
///
/// # Errors
///
/// Returns an error if the backup, the parent directory or the write fails.
/// Nothing is written when the backup fails.
pub fn write_with_backup(path: &Path, content: &[u8]) -> Result<Option<PathBuf>> {
    let backup = if path.is_file() {
        Some(backup_file(path)?)
    } else {
        ensure_parent_dir(path)?;
        None
    };
    std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
    Ok(backup)
}

/// Append `line` to `path` (creating it when missing), backing up an
/// existing file first. A missing trailing newline is added before the line.
///
/// # Errors
///
/// See [`write_with_backup`].
pub fn append_line_with_backup(path: &Path, line: &str) -> Result<Option<PathBuf>> {
    let mut content = match std::fs::read_to_string(path) {
        Ok(existing) => existing,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(line);
    content.push('\n');
    write_with_backup(path, content.as_bytes())
}

/// Whether `content` contains `line` as a whole line (trailing whitespace
/// ignored).
#[must_use]
pub fn has_line(content: &str, line: &str) -> bool {
    let wanted = line.trim_end();
    content.lines().any(|l| l.trim_end() == wanted)
}

/// Backups of `path` currently on disk.
#[cfg(test)]
pub fn backups_of(path: &Path) -> Vec<PathBuf> {
    let Some(dir) = path.parent() else {
        return vec![];
    };
    let prefix = format!(
        "{}.bak.",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    );
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .is_some_and(|n| n.to_string_lossy().starts_with(&prefix))
                })
                .collect()
        })
        .unwrap_or_default()
}
