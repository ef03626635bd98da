// SPDX-FileCopyrightText: The Ferrocene Developers
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Atomic file materialization: a downloaded file's bytes are written to a sibling temp file
//! and renamed into place, so a reader racing the write never observes a partially-written
//! file at the final path.

use crate::errors::Error;
use std::io::Write;
use std::path::Path;

/// Writes `contents` to `path`, creating parent directories as needed. The write goes to a
/// temp file in the same directory first and is renamed into place, so concurrent readers of
/// `path` see either the old state or the fully-written new state, never a partial write.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), Error> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| Error::Create(parent.to_path_buf(), e))?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| Error::Create(parent.to_path_buf(), e))?;
    temp.write_all(contents)
        .map_err(|e| Error::Write(path.to_path_buf(), e))?;
    temp.persist(path)
        .map_err(|e| Error::Write(path.to_path_buf(), e.error))?;
    Ok(())
}
