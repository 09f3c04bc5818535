use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::TallyError;

/// Replaces `path` with `content` through a temp file in the same directory.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<(), TallyError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|err| {
        TallyError::Filesystem(format!("create {}: {err}", parent.display()))
    })?;
    let mut temp = tempfile::Builder::new()
        .prefix(".bgc-tally")
        .tempfile_in(parent)
        .map_err(|err| TallyError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| TallyError::Filesystem(err.to_string()))?;
    temp.persist(path)
        .map_err(|err| TallyError::Filesystem(format!("persist {}: {err}", path.display())))?;
    Ok(())
}

/// Entries of `dir` sorted by file name so traversal order does not depend on the filesystem.
pub fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, TallyError> {
    let entries = fs::read_dir(dir)
        .map_err(|err| TallyError::Filesystem(format!("read {}: {err}", dir.display())))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| TallyError::Filesystem(err.to_string()))?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

/// A directory that is not reached through a symlink, so a walk cannot loop back on itself.
pub fn is_plain_dir(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false)
}

pub fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
