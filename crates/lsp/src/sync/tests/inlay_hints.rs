use super::*;
use crate::registry::LanguageServerConfig;
use lsp_types::{InlayHint, InlayHintLabel, OneOf, Position, ServerCapabilities};

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

fn hint() -> InlayHint {
    InlayHint {
        position: Position::new(0, 0),
        label: InlayHintLabel::String("i32".into()),
        kind: None,
        text_edits: None,
        tooltip: None,
        padding_left: None,
        padding_right: None,
        data: None,
    }
}

#[tokio::test(start_paused = true)]
async fn inlay_hints_gated_on_inlay_hint_provider() {
    let transport = Arc::new(InitRecordingTransport::with_capabilities(ServerCapabilities::default()));
    let client = ready_client(transport).await;
    assert!(!client.supports_inlay_hint());
    assert!(client.inlay_hints(uri("/a.rs"), Range::default()).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn inlay_hints_returns_hints_when_supported() {
    let capabilities = ServerCapabilities {
        inlay_hint_provider: Some(OneOf::Left(true)),
        ..Default::default()
    };
    let transport = Arc::new(InitRecordingTransport::with_capabilities(capabilities));
    transport.inner.set_request_response("textDocument/inlayHint", serde_json::to_value(vec![hint()]).unwrap());
    let client = ready_client(transport).await;

    let result = client.inlay_hints(uri("/a.rs"), Range::default()).await.unwrap();
    assert_eq!(result.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn inlay_hint_resolve_errors_without_resolve_provider() {
    let capabilities = ServerCapabilities {
        inlay_hint_provider: Some(OneOf::Left(true)),
        ..Default::default()
    };
    let transport = Arc::new(InitRecordingTransport::with_capabilities(capabilities));
    let client = ready_client(transport).await;

    assert!(!client.supports_inlay_hint_resolve());
    let result = client.inlay_hint_resolve(hint()).await;
    assert!(matches!(result, Err(crate::error::Error::CapabilityNotSupported { .. })));
}

#[tokio::test(start_paused = true)]
async fn signal_and_take_inlay_hint_refresh_round_trip_through_sync() {
    let transport = Arc::new(RecordingTransport::new());
    let (sync, _registry, _documents, _receiver) = DocumentSync::create(transport);
    assert!(!sync.take_inlay_hint_refresh());
    sync.signal_inlay_hint_refresh();
    assert!(sync.take_inlay_hint_refresh());
    assert!(!sync.take_inlay_hint_refresh());
}
