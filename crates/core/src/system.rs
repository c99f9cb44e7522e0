// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Small filesystem helpers shared across the agent.

use std::fs;
use std::io;
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

/// Whether a file (or directory) exists at `path`.
///
/// Distinguishes "does not exist" from other stat failures (permission
/// errors are surfaced, not swallowed).
pub fn file_exists(path: impl AsRef<Path>) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Remove every entry inside `dir`, keeping the directory itself.
pub fn remove_dir_content(dir: impl AsRef<Path>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Write `contents` to `path` with mode 0600.
///
/// The explicit chmod after the write is required: the creation mode is
/// subject to the process umask.
pub fn write_file_0600(path: impl AsRef<Path>, contents: &[u8]) -> io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(&path)?;
    file.write_all(contents)?;
    drop(file);

    fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
}

#[cfg(test)]
#[path = "system_tests.rs"]
mod tests;
