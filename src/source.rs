//! Atomic file replacement for the source log and the CSV outputs.
//!
//! Content is written to `<name>.tmp` next to the target, synced, then
//! renamed over the target, so readers see either the old file or the new
//! one and never a partial write.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Replace `path` with `bytes` via a temporary sibling and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = tmp_path(path);
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.flush()?;
        file.sync_all()?;
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

/// Truncate the source log to an empty JSON array.
///
/// Returns `false` without touching anything when the file does not exist.
pub fn clear_source(path: &Path) -> io::Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    write_atomic(path, b"[]")?;
    Ok(true)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
