use super::*;
use crate::registry::LanguageServerConfig;
use lsp_types::{OneOf, Position, PrepareRenameResponse, RenameOptions, ServerCapabilities, WorkDoneProgressOptions, WorkspaceEdit};

async fn ready_client(transport: Arc<dyn crate::client::transport::LspTransport>) -> crate::client::ClientHandle {
    let registry = Arc::new(crate::registry::LanguageServerRegistry::new(transport));
    registry.register("rust", LanguageServerConfig { command: "rust-analyzer".into(), ..Default::default() });
    registry.acquire("rust").await.unwrap();
    let client = registry.get("rust", Path::new("/a.rs")).unwrap();
    wait_until_initialized(&client).await;
    client
}

fn uri(path: &str) -> Uri {
    crate::uri_from_path(Path::new(path)).unwrap()
}

#[tokio::test(start_paused = true)]
async fn prepare_rename_requires_prepare_provider_flag() {
    let capabilities = ServerCapabilities {
        rename_provider: Some(OneOf::Left(true)),
        ..Default::default()
    };
    let transport = Arc::new(InitRecordingTransport::with_capabilities(capabilities));
    let client = ready_client(transport.clone()).await;

    let result = client.prepare_rename(uri("/a.rs"), Position::new(0, 0)).await.unwrap();
    assert!(result.is_none(), "prepareRename must not fire without prepareProvider: true");
    assert!(!transport.inner.recorded_methods().contains(&"textDocument/prepareRename".to_string()));
}

#[tokio::test(start_paused = true)]
async fn prepare_rename_sends_request_when_prepare_provider_advertised() {
    let capabilities = ServerCapabilities {
        rename_provider: Some(OneOf::Right(RenameOptions {
            prepare_provider: Some(true),
            work_done_progress_options: WorkDoneProgressOptions::default(),
        })),
        ..Default::default()
    };
    let transport = Arc::new(InitRecordingTransport::with_capabilities(capabilities));
    transport.inner.set_request_response(
        "textDocument/prepareRename",
        serde_json::to_value(PrepareRenameResponse::Range(Range::default())).unwrap(),
    );
    let client = ready_client(transport.clone()).await;

    assert!(client.supports_prepare_rename());
    let result = client.prepare_rename(uri("/a.rs"), Position::new(0, 0)).await.unwrap();
    assert!(matches!(result, Some(PrepareRenameResponse::Range(_))));
}

#[tokio::test(start_paused = true)]
async fn rename_sends_new_name_in_request_params() {
    let capabilities = ServerCapabilities {
        rename_provider: Some(OneOf::Left(true)),
        ..Default::default()
    };
    let transport = Arc::new(InitRecordingTransport::with_capabilities(capabilities));
    transport.inner.set_request_response("textDocument/rename", serde_json::to_value(WorkspaceEdit::default()).unwrap());
    let client = ready_client(transport.clone()).await;

    let result = client.rename(uri("/a.rs"), Position::new(3, 4), "new_name".into()).await.unwrap();
    assert!(result.is_some());

    let recorded = transport.inner.recorded();
    let rename_req = recorded.iter().find(|m| m.method == "textDocument/rename");
    assert!(rename_req.is_some(), "textDocument/rename must be sent");
}

#[tokio::test(start_paused = true)]
async fn rename_gated_on_rename_provider() {
    let transport = Arc::new(InitRecordingTransport::with_capabilities(ServerCapabilities::default()));
    let client = ready_client(transport).await;
    assert!(client.rename(uri("/a.rs"), Position::new(0, 0), "x".into()).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn references_gated_on_references_provider() {
    let transport = Arc::new(InitRecordingTransport::with_capabilities(ServerCapabilities::default()));
    let client = ready_client(transport).await;
    assert!(client.references(uri("/a.rs"), Position::new(0, 0), false).await.unwrap().is_none());
}
