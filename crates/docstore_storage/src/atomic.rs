//! Atomic file replacement and not-found-tolerant reads.

use crate::error::StorageResult;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Suffix appended to a target path while its replacement is being written.
const TEMP_SUFFIX: &str = ".tmp";

fn temp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(TEMP_SUFFIX);
    PathBuf::from(os)
}

/// Atomically replaces the contents of `path` with `bytes`.
///
/// The sequence is:
/// 1. Write `bytes` to `<path>.tmp`
/// 2. Sync the temp file to disk
/// 3. Rename the temp file onto `path`
/// 4. Fsync the parent directory so the rename itself is durable
///
/// Rename within one directory is atomic on POSIX filesystems, so a reader
/// that opens `path` sees either the previous complete contents or the new
/// complete contents, never a mix.
///
/// # Errors
///
/// If the temp write fails, the original file is untouched. If the rename
/// fails, the temp file may be left behind as an orphan; the original file
/// is still untouched.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let tmp = temp_path(path);

    let mut file = File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, path)?;
    sync_parent(path)?;

    Ok(())
}

/// Reads the full contents of `path`.
///
/// Returns `None` if the file does not exist. All other I/O failures
/// propagate.
pub fn read(path: &Path) -> StorageResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Removes the file at `path`.
///
/// Returns `false` if the file did not exist, `true` if it was removed.
/// The parent directory is fsynced after a successful removal.
pub fn remove(path: &Path) -> StorageResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            sync_parent(path)?;
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Fsyncs the parent directory of `path` so entry creation, rename, and
/// removal survive a crash.
#[cfg(unix)]
fn sync_parent(path: &Path) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        let dir = File::open(parent)?;
        dir.sync_all()?;
    }
    Ok(())
}

/// Windows NTFS journaling provides metadata durability; directory fsync is
/// not supported there.
#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> StorageResult<()> {
    Ok(())
}
