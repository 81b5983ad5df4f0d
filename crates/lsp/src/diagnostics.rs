//! Diagnostic reconciliation: prefer pulling fresh diagnostics when the
//! server supports `textDocument/diagnostic`, otherwise wait for the push
//! (`textDocument/publishDiagnostics`) to settle, nudging a stalled server
//! with an insert-then-restore edit pair if nothing arrives.

use std::time::Duration;

use codebridge_rpc::AnyRequest;
use lsp_types::{Diagnostic, Uri};
use serde_json::json;

use crate::client::transport::LspTransport;
use crate::documents::DocumentStore;
use crate::error::{Error, Result};
use crate::ids::LanguageServerId;
use crate::registry::LanguageServerRegistry;

const PULL_TIMEOUT: Duration = Duration::from_secs(5);
const PUSH_IDLE_WAIT: Duration = Duration::from_secs(5);
const NUDGE_WAIT: Duration = Duration::from_secs(3);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Fetch the current diagnostics for `uri`, open under `language`.
///
/// If the server advertises `diagnosticProvider`, pulls directly via
/// `textDocument/diagnostic`. Otherwise waits for the most recent
/// `publishDiagnostics` push to stabilize (no update for one full poll
/// interval), and if none ever arrives, nudges the server with a harmless
/// insert-then-restore `didChange` pair and waits once more before giving
/// up and returning whatever is cached (possibly empty).
pub async fn diagnostics_for(
    transport: &dyn LspTransport,
    registry: &LanguageServerRegistry,
    documents: &DocumentStore,
    uri: &Uri,
    language: &str,
) -> Result<Vec<Diagnostic>> {
    let server = documents
        .server_for(uri)
        .ok_or_else(|| Error::Protocol(format!("{} is not open", uri.as_str())))?;

    if registry.supports(language, "diagnosticProvider") {
        return pull(transport, server, uri).await;
    }

    wait_for_push(documents, uri, PUSH_IDLE_WAIT).await;
    if documents.has_diagnostics(uri) {
        return Ok(documents.get_diagnostics(uri));
    }

    nudge(transport, documents, uri).await?;
    wait_for_push(documents, uri, NUDGE_WAIT).await;
    Ok(documents.get_diagnostics(uri))
}

async fn pull(transport: &dyn LspTransport, server: LanguageServerId, uri: &Uri) -> Result<Vec<Diagnostic>> {
    let request = AnyRequest {
        id: codebridge_rpc::RequestId::Number(0),
        method: "textDocument/diagnostic".to_string(),
        params: json!({"textDocument": {"uri": uri.as_str()}}),
    };
    let response = transport.request(server, request, Some(PULL_TIMEOUT)).await?;
    let payload = response.payload.map_err(|e| Error::Protocol(e.message))?;
    let items = payload
        .get("items")
        .cloned()
        .unwrap_or(serde_json::Value::Array(Vec::new()));
    let diagnostics: Vec<Diagnostic> = serde_json::from_value(items)?;
    Ok(diagnostics)
}

/// Poll `DocumentStore` until its diagnostic entry for `uri` has gone
/// `poll_interval` without an update, or `deadline` elapses with nothing
/// ever arriving.
async fn wait_for_push(documents: &DocumentStore, uri: &Uri, deadline: Duration) {
    let start = tokio::time::Instant::now();
    loop {
        if let Some(age) = documents.diagnostic_age(uri) {
            if age >= POLL_INTERVAL {
                return;
            }
        }
        if start.elapsed() >= deadline {
            return;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// A harmless edit pair — append a single space at the top of the document,
/// then immediately restore it — to coax a server that batches diagnostics
/// on `didChange` into publishing again, for servers that never push on
/// `didOpen` alone. Sent as two consecutive versions (`v`, then `v + 1`)
/// rather than one no-op change, since some servers skip re-analysis for a
/// `didChange` whose range is already empty.
async fn nudge(transport: &dyn LspTransport, documents: &DocumentStore, uri: &Uri) -> Result<()> {
    let server = documents
        .server_for(uri)
        .ok_or_else(|| Error::Protocol(format!("{} is not open", uri.as_str())))?;

    let insert_version = documents
        .bump_version(uri)
        .ok_or_else(|| Error::Protocol(format!("{} is not open", uri.as_str())))?;
    let insert = codebridge_rpc::AnyNotification {
        method: "textDocument/didChange".to_string(),
        params: json!({
            "textDocument": {"uri": uri.as_str(), "version": insert_version},
            "contentChanges": [{
                "range": {"start": {"line": 0, "character": 0}, "end": {"line": 0, "character": 0}},
                "text": " ",
            }],
        }),
    };
    transport.notify(server, insert).await?;

    let restore_version = documents
        .bump_version(uri)
        .ok_or_else(|| Error::Protocol(format!("{} is not open", uri.as_str())))?;
    let restore = codebridge_rpc::AnyNotification {
        method: "textDocument/didChange".to_string(),
        params: json!({
            "textDocument": {"uri": uri.as_str(), "version": restore_version},
            "contentChanges": [{
                "range": {"start": {"line": 0, "character": 0}, "end": {"line": 0, "character": 1}},
                "text": "",
            }],
        }),
    };
    transport.notify(server, restore).await
}

pub fn signal_refresh(documents: &DocumentStore) {
    documents.signal_diagnostic_refresh();
}
