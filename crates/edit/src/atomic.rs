use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write `contents` to `target` by creating a temp file in `target`'s own
/// directory and renaming it over `target`. This keeps the temp file on the
/// same filesystem as the target (a rename across mount points fails), and
/// the rename makes the new content visible to concurrent readers all at
/// once rather than through a partially-written file.
pub fn write_atomic(target: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let temp_path = temp_path_in(dir, target);
    let write_result = (|| -> io::Result<()> {
        fs::write(&temp_path, contents)?;
        fs::rename(&temp_path, target)?;
        Ok(())
    })();
    if write_result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    write_result
}

fn temp_path_in(dir: &Path, target: &Path) -> PathBuf {
    let pid = std::process::id();
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
    let random: u32 = rand::thread_rng().gen();
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    dir.join(format!(".{file_name}.{pid}.{counter}.{random:08x}.tmp"))
}
