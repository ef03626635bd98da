// SPDX-FileCopyrightText: The Ferrocene Developers
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Explicit replacements for the `std::fs`/`std::env` primitives, for application code that
//! wants transparent access to a mounted repository. There is no way to monkey-patch
//! `std::fs::File::open` or `std::env::set_current_dir` process-wide in Rust, so these free
//! functions take their place: each consults the path router and either dispatches to the
//! owning mount or falls through to the real standard-library primitive.

use crate::mount::{OpenOptions, OpenedFile, StatInfo};
use crate::router;
use std::fs;
use std::io;
use std::path::Path;

/// Replacement for `std::fs::File::open`/`std::fs::OpenOptions::open`. Dispatches to the
/// owning mount's `open` when `path` falls under a mounted root, and to the real file
/// otherwise.
pub fn open(path: impl AsRef<Path>, opts: OpenOptions) -> io::Result<OpenedFile> {
    let path = path.as_ref();
    match router::resolve(path) {
        Some(mount) => {
            let relpath = mount.relative_path(path).unwrap_or_else(|| path.to_path_buf());
            mount.open(&relpath, &opts).map_err(Into::into)
        }
        None => {
            let file = opts.to_std().open(path)?;
            Ok(OpenedFile::Real(file))
        }
    }
}

/// Replacement for `std::fs::metadata`.
pub fn stat(path: impl AsRef<Path>) -> io::Result<StatInfo> {
    let path = path.as_ref();
    match router::resolve(path) {
        Some(mount) => {
            let relpath = mount.relative_path(path).unwrap_or_else(|| path.to_path_buf());
            mount.stat(&relpath).map_err(Into::into)
        }
        None => fs::metadata(path).map(StatInfo::Real),
    }
}

/// Replacement for `std::fs::read_dir`, returning the fused local+remote listing for a
/// mounted path or the real directory entries otherwise.
pub fn read_dir(path: impl AsRef<Path>) -> io::Result<Vec<crate::mount::DirEntryInfo>> {
    let path = path.as_ref();
    match router::resolve(path) {
        Some(mount) => {
            let relpath = mount.relative_path(path).unwrap_or_else(|| path.to_path_buf());
            mount.listdir(&relpath, false).map_err(Into::into)
        }
        None => {
            let mut entries = Vec::new();
            for entry in fs::read_dir(path)? {
                let entry = entry?;
                let is_dir = entry.file_type()?.is_dir();
                let size = if is_dir { None } else { entry.metadata().ok().map(|m| m.len()) };
                entries.push(crate::mount::DirEntryInfo {
                    name: entry.file_name().to_string_lossy().to_string(),
                    is_dir,
                    size,
                });
            }
            Ok(entries)
        }
    }
}

/// Replacement for `std::fs::read_dir` that additionally requests remote sizes, mirroring the
/// virtual filesystem's separate `scandir` entry point (spec §4.4); falls through to the same
/// `std::fs::read_dir`-based listing outside a mount.
pub fn scandir(path: impl AsRef<Path>) -> io::Result<Vec<crate::mount::DirEntryInfo>> {
    let path = path.as_ref();
    match router::resolve(path) {
        Some(mount) => {
            let relpath = mount.relative_path(path).unwrap_or_else(|| path.to_path_buf());
            mount.scandir(&relpath, true).map_err(Into::into)
        }
        None => read_dir(path),
    }
}

/// Replacement for `std::env::set_current_dir`. If `path` is inside a mount, the target
/// directory is materialized locally first (creating it if it only exists remotely) so the
/// real `set_current_dir` call that follows always succeeds.
pub fn set_current_dir(path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    if let Some(mount) = router::resolve(path) {
        let relpath = mount.relative_path(path).unwrap_or_else(|| path.to_path_buf());
        mount.chdir(&relpath)?;
    }
    std::env::set_current_dir(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmounted_stat_falls_through_to_std() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, b"hi").unwrap();
        let info = stat(&file).unwrap();
        assert_eq!(info.len(), 2);
    }

    #[test]
    fn unmounted_read_dir_falls_through_to_std() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"x").unwrap();
        let entries = read_dir(dir.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a.txt");
    }
}
