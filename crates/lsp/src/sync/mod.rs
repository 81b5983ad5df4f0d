//! The Document Session Manager: keeps each language server's open-document
//! set in sync with what the caller is editing, including the trickier
//! "reopen" transition when a file is renamed out from under an open
//! session.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use codebridge_rpc::AnyNotification;
use ropey::Rope;
use serde_json::json;
use tokio::sync::mpsc;

use crate::client::transport::{LspTransport, TransportEvent};
use crate::documents::DocumentStore;
use crate::error::{Error, Result};
use crate::registry::LanguageServerRegistry;

/// A full-document resync request, built with the teacher's fluent style:
/// `ChangeRequest::full_text(path, lang, text).with_open_if_needed(true)`.
pub struct ChangeRequest {
    path: PathBuf,
    language: String,
    text: String,
    open_if_needed: bool,
}

impl ChangeRequest {
    pub fn full_text(path: &Path, language: &str, text: String) -> Self {
        Self {
            path: path.to_path_buf(),
            language: language.to_string(),
            text,
            open_if_needed: false,
        }
    }

    pub fn with_open_if_needed(mut self, open_if_needed: bool) -> Self {
        self.open_if_needed = open_if_needed;
        self
    }
}

pub struct DocumentSync {
    transport: Arc<dyn LspTransport>,
    registry: Arc<LanguageServerRegistry>,
    documents: Arc<DocumentStore>,
}

impl DocumentSync {
    /// Build a fresh session manager over `transport`, along with the
    /// registry and document store it shares with the rest of the crate,
    /// and the transport's raw event stream for the caller to pump into
    /// [`crate::diagnostics`] and friends.
    pub fn create(
        transport: Arc<dyn LspTransport>,
    ) -> (
        Self,
        Arc<LanguageServerRegistry>,
        Arc<DocumentStore>,
        mpsc::UnboundedReceiver<TransportEvent>,
    ) {
        let registry = Arc::new(LanguageServerRegistry::new(transport.clone()));
        let documents = Arc::new(DocumentStore::new());
        let events = transport
            .subscribe_events()
            .expect("transport event stream must be available exactly once at construction");
        let sync = Self {
            transport,
            registry: registry.clone(),
            documents: documents.clone(),
        };
        (sync, registry, documents, events)
    }

    /// Open `path` under `language` if it is not already open, reading its
    /// text from `rope` (the caller's in-memory buffer, so no disk read is
    /// needed for a document the caller is actively editing).
    pub async fn open_document(&self, path: &Path, language: &str, rope: &Rope) -> Result<()> {
        self.ensure_open_text(path, language, rope.to_string()).await
    }

    /// Open `path` with the given `text` if it is not already open.
    pub async fn ensure_open_text(&self, path: &Path, language: &str, text: String) -> Result<()> {
        let uri = crate::uri::uri_from_path(path)?;
        if self.documents.is_opened(&uri) {
            return Ok(());
        }

        let server = self.registry.acquire(language).await?;
        let extension = crate::uri::extension_of(path);
        let notification = AnyNotification {
            method: "textDocument/didOpen".to_string(),
            params: json!({
                "textDocument": {
                    "uri": uri.as_str(),
                    "languageId": crate::uri::language_id_for_extension(&extension),
                    "version": 1,
                    "text": text,
                }
            }),
        };
        self.transport.notify(server, notification).await?;
        self.documents.register(&uri, server, language);
        Ok(())
    }

    /// Resync a document's full text after the Workspace Edit Applier has
    /// written to disk. Always a full-document replacement, never a diff.
    pub async fn sync_after_edit(&self, path: &Path) -> Result<()> {
        let uri = crate::uri::uri_from_path(path)?;
        let server = self
            .documents
            .server_for(&uri)
            .ok_or_else(|| Error::Protocol(format!("{} is not open", path.display())))?;
        let text = std::fs::read_to_string(path)?;
        let version = self
            .documents
            .bump_version(&uri)
            .ok_or_else(|| Error::Protocol(format!("{} is not open", path.display())))?;

        let notification = AnyNotification {
            method: "textDocument/didChange".to_string(),
            params: json!({
                "textDocument": {"uri": uri.as_str(), "version": version},
                "contentChanges": [{"text": text}],
            }),
        };
        self.transport.notify(server, notification).await?;
        Ok(())
    }

    /// Close `path`, unregistering it and clearing its diagnostics even if
    /// the `didClose` notification itself fails to send — local bookkeeping
    /// must never disagree with reality because a write failed.
    pub async fn close_document(&self, path: &Path, _language: &str) -> Result<()> {
        let uri = crate::uri::uri_from_path(path)?;
        let Some(server) = self.documents.server_for(&uri) else {
            return Ok(());
        };

        let notification = AnyNotification {
            method: "textDocument/didClose".to_string(),
            params: json!({"textDocument": {"uri": uri.as_str()}}),
        };
        let result = self.transport.notify(server, notification).await;
        self.documents.unregister(&uri);
        result.map_err(Into::into)
    }

    /// `didClose(old)` followed by `didOpen(new)`, even across a change of
    /// language server. The new document is only registered if `didOpen`
    /// succeeds; the old one is always unregistered regardless of whether
    /// `didClose` succeeded.
    pub async fn reopen_document(
        &self,
        old_path: &Path,
        old_language: &str,
        new_path: &Path,
        new_language: &str,
        new_text: String,
    ) -> Result<()> {
        let close_result = self.close_document(old_path, old_language).await;
        let open_result = self.ensure_open_text(new_path, new_language, new_text).await;
        close_result?;
        open_result
    }

    /// Send a full-document `didChange`, opening first if the document
    /// isn't already open and `open_if_needed` was requested. Marks
    /// force-full-sync on the document if the send itself fails, so the
    /// next resync attempt knows not to trust an incremental diff.
    pub async fn send_change(&self, request: ChangeRequest) -> Result<()> {
        let uri = crate::uri::uri_from_path(&request.path)?;

        if !self.documents.is_opened(&uri) {
            if !request.open_if_needed {
                return Err(Error::Protocol(format!(
                    "{} is not open",
                    request.path.display()
                )));
            }
            self.ensure_open_text(&request.path, &request.language, request.text)
                .await?;
            return Ok(());
        }

        let server = self
            .documents
            .server_for(&uri)
            .ok_or_else(|| Error::Protocol(format!("{} is not open", request.path.display())))?;
        let version = self
            .documents
            .bump_version(&uri)
            .ok_or_else(|| Error::Protocol(format!("{} is not open", request.path.display())))?;

        let notification = AnyNotification {
            method: "textDocument/didChange".to_string(),
            params: json!({
                "textDocument": {"uri": uri.as_str(), "version": version},
                "contentChanges": [{"text": request.text}],
            }),
        };
        if let Err(err) = self.transport.notify(server, notification).await {
            self.documents.mark_force_full_sync(&uri);
            return Err(err.into());
        }
        Ok(())
    }

    pub fn signal_diagnostic_refresh(&self) {
        self.documents.signal_diagnostic_refresh();
    }

    pub fn take_diagnostic_refresh(&self) -> bool {
        self.documents.take_diagnostic_refresh()
    }

    pub fn signal_inlay_hint_refresh(&self) {
        self.documents.signal_inlay_hint_refresh();
    }

    pub fn take_inlay_hint_refresh(&self) -> bool {
        self.documents.take_inlay_hint_refresh()
    }
}

#[cfg(test)]
mod tests;
