use std::path::PathBuf;

use crate::atomic::write_atomic;

/// In-memory snapshot of a file taken before the first edit touches it.
/// `target_path` is the resolved symlink target when `requested_path` is a
/// link, otherwise identical to it.
pub struct FileBackup {
    pub requested_path: PathBuf,
    pub target_path: PathBuf,
    pub original_bytes: Vec<u8>,
    /// Present if an on-disk `.bak` sibling was also written for this file.
    pub bak_path: Option<PathBuf>,
}

impl FileBackup {
    /// Restore `target_path` to `original_bytes`. Logged, not propagated —
    /// callers are already unwinding after the primary failure and must
    /// attempt every remaining rollback regardless of earlier ones failing.
    pub fn restore(&self) {
        if let Err(err) = write_atomic(&self.target_path, &self.original_bytes) {
            tracing::error!(
                path = %self.target_path.display(),
                error = %err,
                "failed to roll back file after a failed workspace edit apply"
            );
        }
        if let Some(bak) = &self.bak_path {
            let _ = std::fs::remove_file(bak);
        }
    }
}
