//! Size-based rotation for the per-project stream files.
//!
//! Slot 0 is the live file and slot `n` is `<name>.n`. Rotating moves every
//! slot up by one; whatever would land past the last kept slot is deleted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Stream files rotate once they reach 10 MiB.
pub const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;

/// Rotated copies kept per stream file.
pub const KEEP_ROTATED: usize = 5;

/// Shift `live` into `<name>.1` when it has reached `limit` bytes, keeping at
/// most `keep` copies. The live file is left absent; the next append
/// recreates it. Returns whether anything moved.
pub fn rotate_if_needed(live: &Path, limit: u64, keep: usize) -> io::Result<bool> {
    match fs::metadata(live) {
        Ok(meta) if meta.len() >= limit => {}
        Ok(_) => return Ok(false),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    }

    let slots: Vec<PathBuf> = (0..=keep).map(|n| slot(live, n)).collect();
    discard(&slots[keep])?;
    for pair in slots.windows(2).rev() {
        if pair[0].exists() {
            fs::rename(&pair[0], &pair[1])?;
        }
    }
    Ok(true)
}

/// Rotate with the default limits, logging instead of failing.
pub fn rotate_stream_file(live: &Path) {
    match rotate_if_needed(live, ROTATE_AT_BYTES, KEEP_ROTATED) {
        Ok(true) => tracing::info!(path = %live.display(), "stream file rotated"),
        Ok(false) => {}
        Err(err) => {
            tracing::warn!(path = %live.display(), error = %err, "stream file rotation failed")
        }
    }
}

fn discard(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

fn slot(live: &Path, n: usize) -> PathBuf {
    if n == 0 {
        return live.to_path_buf();
    }
    let mut name = live.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{n}"));
    live.with_file_name(name)
}
