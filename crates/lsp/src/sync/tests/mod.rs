use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use lsp_types::{Diagnostic, DiagnosticSeverity, Range, Uri};
use ropey::Rope;
use tokio::sync::{mpsc, oneshot};

use super::*;
use crate::ids::LanguageServerId;

mod inlay_hints;
mod navigation;
mod rename_refs;

/// Recorded outbound message (notification or request), in send order.
#[derive(Debug, Clone)]
struct RecordedMessage {
    server_id: LanguageServerId,
    method: String,
    uri: Option<String>,
}

/// Transport that records every notification/request it sees and answers
/// requests from a table of canned responses keyed by method name. Methods
/// listed via `set_fail_method` fail instead of succeeding, to exercise the
/// rollback/force-full-sync paths.
struct RecordingTransport {
    messages: std::sync::Mutex<Vec<RecordedMessage>>,
    next_slot: std::sync::atomic::AtomicU32,
    fail_methods: std::sync::Mutex<std::collections::HashSet<String>>,
    request_responses: std::sync::Mutex<std::collections::HashMap<String, serde_json::Value>>,
}

impl RecordingTransport {
    fn new() -> Self {
        Self {
            messages: std::sync::Mutex::new(Vec::new()),
            next_slot: std::sync::atomic::AtomicU32::new(1),
            fail_methods: std::sync::Mutex::new(std::collections::HashSet::new()),
            request_responses: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }

    fn set_fail_method(&self, method: &str) {
        self.fail_methods.lock().unwrap().insert(method.to_string());
    }

    fn set_request_response(&self, method: &str, response: serde_json::Value) {
        self.request_responses.lock().unwrap().insert(method.to_string(), response);
    }

    fn recorded(&self) -> Vec<RecordedMessage> {
        self.messages.lock().unwrap().clone()
    }

    fn recorded_methods(&self) -> Vec<String> {
        self.messages.lock().unwrap().iter().map(|m| m.method.clone()).collect()
    }

    fn record_notification(&self, server_id: LanguageServerId, notif: &codebridge_rpc::AnyNotification) -> crate::error::Result<()> {
        let uri = notif
            .params
            .get("textDocument")
            .and_then(|td| td.get("uri"))
            .and_then(|u| u.as_str())
            .map(|s| s.to_string());
        self.messages.lock().unwrap().push(RecordedMessage {
            server_id,
            method: notif.method.clone(),
            uri,
        });
        if self.fail_methods.lock().unwrap().contains(&notif.method) {
            return Err(crate::error::Error::Protocol(format!("injected failure for {}", notif.method)));
        }
        Ok(())
    }

    fn record_request(&self, server_id: LanguageServerId, req: &codebridge_rpc::AnyRequest) {
        self.messages.lock().unwrap().push(RecordedMessage {
            server_id,
            method: req.method.clone(),
            uri: None,
        });
    }
}

#[async_trait]
impl crate::client::transport::LspTransport for RecordingTransport {
    fn subscribe_events(&self) -> crate::error::Result<mpsc::UnboundedReceiver<TransportEvent>> {
        let (_tx, rx) = mpsc::unbounded_channel();
        Ok(rx)
    }

    async fn start(&self, _cfg: crate::client::ServerConfig) -> crate::error::Result<crate::client::StartedServer> {
        let slot = self.next_slot.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(crate::client::StartedServer { id: LanguageServerId::new(slot, 0) })
    }

    async fn notify(&self, server: LanguageServerId, notif: codebridge_rpc::AnyNotification) -> crate::error::Result<()> {
        self.record_notification(server, &notif)
    }

    async fn notify_with_barrier(
        &self,
        server: LanguageServerId,
        notif: codebridge_rpc::AnyNotification,
    ) -> crate::error::Result<oneshot::Receiver<crate::error::Result<()>>> {
        let result = self.record_notification(server, &notif);
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Ok(rx)
    }

    async fn request(
        &self,
        server: LanguageServerId,
        req: codebridge_rpc::AnyRequest,
        _timeout: Option<std::time::Duration>,
    ) -> crate::error::Result<codebridge_rpc::AnyResponse> {
        self.record_request(server, &req);
        if let Some(response) = self.request_responses.lock().unwrap().get(&req.method).cloned() {
            return Ok(codebridge_rpc::AnyResponse { id: req.id, payload: Ok(response) });
        }
        Err(crate::error::Error::Protocol("RecordingTransport: no canned response".into()))
    }

    async fn reply(
        &self,
        _server: LanguageServerId,
        _id: codebridge_rpc::RequestId,
        _resp: std::result::Result<codebridge_rpc::JsonValue, codebridge_rpc::ResponseError>,
    ) -> crate::error::Result<()> {
        Ok(())
    }

    async fn stop(&self, _server: LanguageServerId) -> crate::error::Result<()> {
        Ok(())
    }
}

/// [`RecordingTransport`] plus a default `initialize` handler, for tests
/// that need a fully-initialized [`crate::client::ClientHandle`].
struct InitRecordingTransport {
    inner: RecordingTransport,
}

impl InitRecordingTransport {
    fn new() -> Self {
        Self { inner: RecordingTransport::new() }
    }

    fn with_capabilities(capabilities: lsp_types::ServerCapabilities) -> Self {
        let t = Self::new();
        t.inner.set_request_response(
            "initialize",
            serde_json::to_value(lsp_types::InitializeResult { capabilities, server_info: None }).unwrap(),
        );
        t
    }
}

#[async_trait]
impl crate::client::transport::LspTransport for InitRecordingTransport {
    fn subscribe_events(&self) -> crate::error::Result<mpsc::UnboundedReceiver<TransportEvent>> {
        self.inner.subscribe_events()
    }

    async fn start(&self, cfg: crate::client::ServerConfig) -> crate::error::Result<crate::client::StartedServer> {
        self.inner.start(cfg).await
    }

    async fn notify(&self, server: LanguageServerId, notif: codebridge_rpc::AnyNotification) -> crate::error::Result<()> {
        self.inner.notify(server, notif).await
    }

    async fn notify_with_barrier(
        &self,
        server: LanguageServerId,
        notif: codebridge_rpc::AnyNotification,
    ) -> crate::error::Result<oneshot::Receiver<crate::error::Result<()>>> {
        self.inner.notify_with_barrier(server, notif).await
    }

    async fn request(
        &self,
        server: LanguageServerId,
        req: codebridge_rpc::AnyRequest,
        _timeout: Option<std::time::Duration>,
    ) -> crate::error::Result<codebridge_rpc::AnyResponse> {
        self.inner.record_request(server, &req);
        if let Some(response) = self.inner.request_responses.lock().unwrap().get(&req.method).cloned() {
            return Ok(codebridge_rpc::AnyResponse { id: req.id, payload: Ok(response) });
        }
        if req.method == "initialize" {
            return Ok(codebridge_rpc::AnyResponse {
                id: req.id,
                payload: Ok(serde_json::to_value(lsp_types::InitializeResult {
                    capabilities: lsp_types::ServerCapabilities::default(),
                    server_info: None,
                })
                .unwrap()),
            });
        }
        Err(crate::error::Error::Protocol(format!("InitRecordingTransport: no handler for {}", req.method)))
    }

    async fn reply(
        &self,
        _server: LanguageServerId,
        _id: codebridge_rpc::RequestId,
        _resp: std::result::Result<codebridge_rpc::JsonValue, codebridge_rpc::ResponseError>,
    ) -> crate::error::Result<()> {
        Ok(())
    }

    async fn stop(&self, _server: LanguageServerId) -> crate::error::Result<()> {
        Ok(())
    }
}

/// Poll a freshly-acquired client until its server finishes initializing,
/// matching how an embedder would wait before issuing the first request.
async fn wait_until_initialized(client: &crate::client::ClientHandle) {
    for _ in 0..100 {
        if client.is_initialized() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("client did not become initialized in time");
}
