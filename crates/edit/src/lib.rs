//! Atomic, symlink-preserving application of LSP-shaped workspace edits.
//!
//! [`apply`] takes an [`lsp_types::WorkspaceEdit`], validates every range
//! against the file it targets, and commits all of it or none of it: if any
//! file in the edit fails to validate or write, every file already written
//! during this call is rolled back to its original bytes.

mod atomic;
mod backup;
mod error;
mod line_ending;
pub mod uri;

pub use error::{Error, Result};
pub use line_ending::LineEnding;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use backup::FileBackup;
use lsp_types::{Range, TextEdit, Uri, WorkspaceEdit};

/// Invoked after a file is successfully written, so the caller can resync an
/// open LSP document session without this crate depending on the LSP layer.
pub trait ResyncHook: Send + Sync {
    fn document_changed(&self, path: &Path);
}

#[derive(Default, Clone)]
pub struct ApplyOptions {
    pub validate: bool,
    pub create_backups: bool,
    pub resync_hook: Option<Arc<dyn ResyncHook>>,
}

impl ApplyOptions {
    pub fn new() -> Self {
        Self {
            validate: true,
            create_backups: true,
            resync_hook: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApplyResult {
    pub files_modified: Vec<PathBuf>,
    pub backup_files: Vec<PathBuf>,
}

/// Apply `edit` to disk. On any failure, every file already written during
/// this call is restored to its pre-apply bytes before the error is
/// returned; partially-applied edits are never observable by a reader that
/// only looks at the files after `apply` returns.
pub fn apply(edit: &WorkspaceEdit, options: &ApplyOptions) -> Result<ApplyResult> {
    let changes = match &edit.changes {
        Some(changes) if !changes.is_empty() => changes,
        _ => {
            return Ok(ApplyResult {
                files_modified: Vec::new(),
                backup_files: Vec::new(),
            })
        }
    };

    let mut backups: Vec<FileBackup> = Vec::new();
    let mut requested_paths: Vec<(PathBuf, PathBuf)> = Vec::new();

    for (file_uri, edits) in changes {
        match apply_one_file(file_uri, edits, options) {
            Ok(backup) => {
                let requested = backup.requested_path.clone();
                let target = backup.target_path.clone();
                if let Some(hook) = &options.resync_hook {
                    hook.document_changed(&requested);
                }
                requested_paths.push((requested, target));
                backups.push(backup);
            }
            Err(err) => {
                for backup in backups.iter().rev() {
                    backup.restore();
                }
                return Err(err);
            }
        }
    }

    let backup_files = backups
        .iter()
        .filter_map(|b| b.bak_path.clone())
        .collect();
    let files_modified = requested_paths.into_iter().map(|(req, _)| req).collect();

    Ok(ApplyResult {
        files_modified,
        backup_files,
    })
}

fn apply_one_file(
    file_uri: &Uri,
    edits: &[TextEdit],
    options: &ApplyOptions,
) -> Result<FileBackup> {
    let uri = url::Url::parse(file_uri.as_str())
        .map_err(|_| Error::UnsupportedUri { uri: file_uri.as_str().to_string() })?;
    let requested_path = uri::uri_to_path(&uri)?;

    let metadata = fs::symlink_metadata(&requested_path).map_err(|source| Error::Unreadable {
        path: requested_path.clone(),
        source,
    })?;
    let target_path = if metadata.file_type().is_symlink() {
        fs::canonicalize(&requested_path).map_err(|source| Error::Unreadable {
            path: requested_path.clone(),
            source,
        })?
    } else {
        requested_path.clone()
    };

    let target_meta = fs::metadata(&target_path).map_err(|source| Error::Unreadable {
        path: requested_path.clone(),
        source,
    })?;
    if !target_meta.is_file() {
        return Err(Error::NotRegularFile {
            path: requested_path,
        });
    }

    let original_bytes = fs::read(&target_path).map_err(|source| Error::Io {
        path: requested_path.clone(),
        source,
    })?;
    let original_text = String::from_utf8(original_bytes.clone())
        .map_err(|_| Error::NotUtf8 { path: requested_path.clone() })?;

    let bak_path = if options.create_backups {
        let bak = bak_sibling(&target_path);
        fs::write(&bak, &original_bytes).map_err(|source| Error::Io {
            path: requested_path.clone(),
            source,
        })?;
        Some(bak)
    } else {
        None
    };

    // Everything from here on can fail mid-way; if it does, the `.bak` we
    // just wrote above must not be left orphaned on disk — the caller's
    // rollback only cleans up `.bak`s belonging to files that succeeded.
    let write_result = (|| -> Result<()> {
        let ending = LineEnding::detect(&original_text);
        let mut lines: Vec<String> = line_ending::split_lines(&original_text)
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut sorted_edits: Vec<&TextEdit> = edits.iter().collect();
        sorted_edits.sort_by(|a, b| {
            (b.range.start.line, b.range.start.character)
                .cmp(&(a.range.start.line, a.range.start.character))
        });

        for edit in sorted_edits {
            if options.validate {
                validate_range(&requested_path, edit.range, &lines)?;
            }
            apply_text_edit(&mut lines, edit);
        }

        let new_text = line_ending::join_lines(&lines, ending);
        atomic::write_atomic(&target_path, new_text.as_bytes()).map_err(|source| Error::Io {
            path: requested_path.clone(),
            source,
        })?;
        Ok(())
    })();

    if let Err(err) = write_result {
        if let Some(bak) = &bak_path {
            let _ = fs::remove_file(bak);
        }
        return Err(err);
    }

    Ok(FileBackup {
        requested_path,
        target_path,
        original_bytes,
        bak_path,
    })
}

fn bak_sibling(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".bak");
    target.with_file_name(name)
}

fn validate_range(path: &Path, range: Range, lines: &[String]) -> Result<()> {
    let invalid = |reason: &str| {
        Err(Error::InvalidRange {
            path: path.to_path_buf(),
            start_line: range.start.line,
            start_char: range.start.character,
            end_line: range.end.line,
            end_char: range.end.character,
            reason: reason.to_string(),
        })
    };

    let line_count = lines.len() as u32;
    if range.start.line >= line_count || range.end.line >= line_count {
        return invalid("line out of bounds");
    }
    if (range.start.line, range.start.character) > (range.end.line, range.end.character) {
        return invalid("start is after end");
    }
    let start_line_len = utf16_len(&lines[range.start.line as usize]);
    if range.start.character > start_line_len {
        return invalid("start character out of bounds");
    }
    let end_line_len = utf16_len(&lines[range.end.line as usize]);
    if range.end.character > end_line_len {
        return invalid("end character out of bounds");
    }
    Ok(())
}

fn utf16_len(s: &str) -> u32 {
    s.encode_utf16().count() as u32
}

/// Slice a line by UTF-16 code-unit offsets, the unit LSP ranges use.
fn utf16_slice(s: &str, start: u32, end: u32) -> (String, String, String) {
    let units: Vec<u16> = s.encode_utf16().collect();
    let start = start.min(units.len() as u32) as usize;
    let end = end.min(units.len() as u32) as usize;
    let before = String::from_utf16_lossy(&units[..start]);
    let _middle = String::from_utf16_lossy(&units[start..end]);
    let after = String::from_utf16_lossy(&units[end..]);
    (before, _middle, after)
}

fn apply_text_edit(lines: &mut Vec<String>, edit: &TextEdit) {
    let start_line = edit.range.start.line as usize;
    let end_line = edit.range.end.line as usize;

    if start_line == end_line {
        let (before, _middle, after) =
            utf16_slice(&lines[start_line], edit.range.start.character, edit.range.end.character);
        lines[start_line] = format!("{before}{}{after}", edit.new_text);
        return;
    }

    let (before, _, _) = utf16_slice(&lines[start_line], edit.range.start.character, utf16_len(&lines[start_line]));
    let (_, _, after) = utf16_slice(&lines[end_line], 0, edit.range.end.character);
    let replacement = format!("{before}{}{after}", edit.new_text);

    lines.splice(start_line..=end_line, std::iter::once(replacement));
}
