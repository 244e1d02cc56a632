//! Advisory lock around record store appends.
//!
//! Cross-platform (fs2) exclusive lock on a side file `<csv path>.lock`.
//! Off by default (SQR_LOCK_APPENDS); the CSV itself is never locked, so
//! readers are not blocked. Lock is released on Drop.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::consts::LOCK_SUFFIX;

pub struct LockGuard {
    file: std::fs::File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // fs2 unlock errors on drop are ignored deliberately.
        let _ = self.file.unlock();
    }
}

/// `<store>.lock` next to the store file.
pub fn lock_file_path(store: &Path) -> PathBuf {
    let mut s: OsString = store.as_os_str().to_os_string();
    s.push(LOCK_SUFFIX);
    PathBuf::from(s)
}

fn open_lock_file(store: &Path) -> Result<std::fs::File> {
    let path = lock_file_path(store);
    let f = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(&path)
        .with_context(|| format!("open lock file {}", path.display()))?;
    Ok(f)
}

/// Acquire the exclusive append lock. Blocks until acquired.
pub fn acquire_exclusive_lock(store: &Path) -> Result<LockGuard> {
    let file = open_lock_file(store)?;
    let path = lock_file_path(store);
    file.lock_exclusive()
        .with_context(|| format!("lock_exclusive {}", path.display()))?;
    Ok(LockGuard { file })
}

/// Try to acquire the exclusive append lock. Returns Err if already locked.
pub fn try_acquire_exclusive_lock(store: &Path) -> Result<LockGuard> {
    let file = open_lock_file(store)?;
    let path = lock_file_path(store);
    file.try_lock_exclusive()
        .with_context(|| format!("try_lock_exclusive failed: {}", path.display()))?;
    Ok(LockGuard { file })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_path_appends_suffix() {
        let p = lock_file_path(Path::new("data/students.csv"));
        assert_eq!(p, PathBuf::from("data/students.csv.lock"));
    }
}
