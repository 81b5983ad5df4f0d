//! The open-document and diagnostic bookkeeping shared by [`crate::sync`]
//! and [`crate::diagnostics`]. Kept as plain in-memory maps guarded by a
//! single lock each — this process is the sole owner, so no external
//! synchronization is needed beyond that.

use std::collections::HashMap;
use std::time::Instant;

use lsp_types::{Diagnostic, Uri};
use parking_lot::Mutex;

use crate::ids::LanguageServerId;

struct OpenDocument {
    server: LanguageServerId,
    language: String,
    version: i32,
    /// Set when a `didChange` send failed and the next sync must be a full
    /// re-send rather than trusting the server still has a consistent view.
    force_full_sync: bool,
}

struct DiagnosticEntry {
    diagnostics: Vec<Diagnostic>,
    version: Option<i32>,
    updated_at: Instant,
}

#[derive(Default)]
pub struct DocumentStore {
    open: Mutex<HashMap<String, OpenDocument>>,
    diagnostics: Mutex<HashMap<String, DiagnosticEntry>>,
    diagnostic_refresh: std::sync::atomic::AtomicBool,
    inlay_hint_refresh: std::sync::atomic::AtomicBool,
}

fn key(uri: &Uri) -> String {
    uri.as_str().to_string()
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_opened(&self, uri: &Uri) -> bool {
        self.open.lock().contains_key(&key(uri))
    }

    pub fn register(&self, uri: &Uri, server: LanguageServerId, language: &str) {
        self.open.lock().insert(
            key(uri),
            OpenDocument {
                server,
                language: language.to_string(),
                version: 1,
                force_full_sync: false,
            },
        );
    }

    pub fn unregister(&self, uri: &Uri) {
        self.open.lock().remove(&key(uri));
        self.diagnostics.lock().remove(&key(uri));
    }

    pub fn server_for(&self, uri: &Uri) -> Option<LanguageServerId> {
        self.open.lock().get(&key(uri)).map(|d| d.server)
    }

    pub fn language_for(&self, uri: &Uri) -> Option<String> {
        self.open.lock().get(&key(uri)).map(|d| d.language.clone())
    }

    /// Assign and return the next version for an already-open document.
    pub fn bump_version(&self, uri: &Uri) -> Option<i32> {
        let mut open = self.open.lock();
        let doc = open.get_mut(&key(uri))?;
        doc.version += 1;
        Some(doc.version)
    }

    pub fn update_diagnostics(&self, uri: &Uri, diagnostics: Vec<Diagnostic>, version: Option<i32>) {
        self.diagnostics.lock().insert(
            key(uri),
            DiagnosticEntry {
                diagnostics,
                version,
                updated_at: Instant::now(),
            },
        );
    }

    pub fn get_diagnostics(&self, uri: &Uri) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .get(&key(uri))
            .map(|e| e.diagnostics.clone())
            .unwrap_or_default()
    }

    pub fn has_diagnostics(&self, uri: &Uri) -> bool {
        self.diagnostics.lock().contains_key(&key(uri))
    }

    pub fn diagnostic_version(&self, uri: &Uri) -> Option<i32> {
        self.diagnostics.lock().get(&key(uri)).and_then(|e| e.version)
    }

    pub fn diagnostic_age(&self, uri: &Uri) -> Option<std::time::Duration> {
        self.diagnostics
            .lock()
            .get(&key(uri))
            .map(|e| e.updated_at.elapsed())
    }

    pub fn mark_force_full_sync(&self, uri: &Uri) {
        if let Some(doc) = self.open.lock().get_mut(&key(uri)) {
            doc.force_full_sync = true;
        }
    }

    /// Read and clear the force-full-sync flag for `uri` in one step.
    pub fn take_force_full_sync_by_uri(&self, uri: &Uri) -> bool {
        self.open
            .lock()
            .get_mut(&key(uri))
            .map(|doc| std::mem::replace(&mut doc.force_full_sync, false))
            .unwrap_or(false)
    }

    pub fn signal_inlay_hint_refresh(&self) {
        self.inlay_hint_refresh
            .store(true, std::sync::atomic::Ordering::Release);
    }

    pub fn take_inlay_hint_refresh(&self) -> bool {
        self.inlay_hint_refresh
            .swap(false, std::sync::atomic::Ordering::AcqRel)
    }

    pub fn signal_diagnostic_refresh(&self) {
        self.diagnostic_refresh
            .store(true, std::sync::atomic::Ordering::Release);
    }

    /// Read and clear the refresh flag in one step.
    pub fn take_diagnostic_refresh(&self) -> bool {
        self.diagnostic_refresh
            .swap(false, std::sync::atomic::Ordering::AcqRel)
    }
}
