use super::*;
use crate::registry::LanguageServerConfig;
use lsp_types::{GotoDefinitionResponse, Location, Position, ServerCapabilities};

async fn ready_client(transport: Arc<dyn crate::client::transport::LspTransport>, capabilities: ServerCapabilities) -> crate::client::ClientHandle {
    let registry = Arc::new(crate::registry::LanguageServerRegistry::new(transport));
    registry.register("rust", LanguageServerConfig { command: "rust-analyzer".into(), ..Default::default() });
    registry.acquire("rust").await.unwrap();
    let client = registry.get("rust", Path::new("/a.rs")).unwrap();
    wait_until_initialized(&client).await;
    let _ = capabilities;
    client
}

fn uri(path: &str) -> Uri {
    crate::uri_from_path(Path::new(path)).unwrap()
}

#[tokio::test(start_paused = true)]
async fn goto_definition_returns_none_when_unsupported() {
    let transport = Arc::new(InitRecordingTransport::with_capabilities(ServerCapabilities::default()));
    let client = ready_client(transport.clone(), ServerCapabilities::default()).await;

    let result = client.goto_definition(uri("/a.rs"), Position::new(0, 0)).await.unwrap();
    assert!(result.is_none());
    assert!(!transport.inner.recorded_methods().contains(&"textDocument/definition".to_string()));
}

#[tokio::test(start_paused = true)]
async fn goto_definition_sends_request_when_supported() {
    let capabilities = ServerCapabilities {
        definition_provider: Some(lsp_types::OneOf::Left(true)),
        ..Default::default()
    };
    let transport = Arc::new(InitRecordingTransport::with_capabilities(capabilities));
    let location = Location { uri: uri("/b.rs"), range: Range::default() };
    transport.inner.set_request_response(
        "textDocument/definition",
        serde_json::to_value(GotoDefinitionResponse::Scalar(location.clone())).unwrap(),
    );
    let client = ready_client(transport.clone(), ServerCapabilities::default()).await;

    let result = client.goto_definition(uri("/a.rs"), Position::new(1, 2)).await.unwrap();
    match result {
        Some(GotoDefinitionResponse::Scalar(l)) => assert_eq!(l.uri.as_str(), location.uri.as_str()),
        other => panic!("unexpected response: {other:?}"),
    }
    assert!(transport.inner.recorded_methods().contains(&"textDocument/definition".to_string()));
}

#[tokio::test(start_paused = true)]
async fn goto_declaration_gated_on_declaration_provider() {
    let transport = Arc::new(InitRecordingTransport::with_capabilities(ServerCapabilities::default()));
    let client = ready_client(transport.clone(), ServerCapabilities::default()).await;
    assert!(client.goto_declaration(uri("/a.rs"), Position::new(0, 0)).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn goto_implementation_gated_on_implementation_provider() {
    let transport = Arc::new(InitRecordingTransport::with_capabilities(ServerCapabilities::default()));
    let client = ready_client(transport.clone(), ServerCapabilities::default()).await;
    assert!(client.goto_implementation(uri("/a.rs"), Position::new(0, 0)).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn goto_type_definition_gated_on_type_definition_provider() {
    let transport = Arc::new(InitRecordingTransport::with_capabilities(ServerCapabilities::default()));
    let client = ready_client(transport.clone(), ServerCapabilities::default()).await;
    assert!(client.goto_type_definition(uri("/a.rs"), Position::new(0, 0)).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn references_includes_declaration_flag_in_request() {
    let capabilities = ServerCapabilities {
        references_provider: Some(lsp_types::OneOf::Left(true)),
        ..Default::default()
    };
    let transport = Arc::new(InitRecordingTransport::with_capabilities(capabilities));
    transport.inner.set_request_response("textDocument/references", serde_json::json!([]));
    let client = ready_client(transport.clone(), ServerCapabilities::default()).await;

    let result = client.references(uri("/a.rs"), Position::new(0, 0), true).await.unwrap();
    assert_eq!(result, Some(vec![]));
}

#[tokio::test(start_paused = true)]
async fn hover_gated_on_hover_provider() {
    let transport = Arc::new(InitRecordingTransport::with_capabilities(ServerCapabilities::default()));
    let client = ready_client(transport.clone(), ServerCapabilities::default()).await;
    assert!(client.hover(uri("/a.rs"), Position::new(0, 0)).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn completion_gated_on_completion_provider() {
    let transport = Arc::new(InitRecordingTransport::with_capabilities(ServerCapabilities::default()));
    let client = ready_client(transport.clone(), ServerCapabilities::default()).await;
    assert!(client.completion(uri("/a.rs"), Position::new(0, 0)).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn signature_help_gated_on_signature_help_provider() {
    let transport = Arc::new(InitRecordingTransport::with_capabilities(ServerCapabilities::default()));
    let client = ready_client(transport.clone(), ServerCapabilities::default()).await;
    assert!(client.signature_help(uri("/a.rs"), Position::new(0, 0)).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn document_symbol_gated_on_document_symbol_provider() {
    let transport = Arc::new(InitRecordingTransport::with_capabilities(ServerCapabilities::default()));
    let client = ready_client(transport.clone(), ServerCapabilities::default()).await;
    assert!(client.document_symbol(uri("/a.rs")).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn folding_range_gated_on_folding_range_provider() {
    let transport = Arc::new(InitRecordingTransport::with_capabilities(ServerCapabilities::default()));
    let client = ready_client(transport.clone(), ServerCapabilities::default()).await;
    assert!(client.folding_range(uri("/a.rs")).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn document_link_gated_on_document_link_provider() {
    let transport = Arc::new(InitRecordingTransport::with_capabilities(ServerCapabilities::default()));
    let client = ready_client(transport.clone(), ServerCapabilities::default()).await;
    assert!(client.document_link(uri("/a.rs")).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn semantic_tokens_full_gated_on_semantic_tokens_provider() {
    let transport = Arc::new(InitRecordingTransport::with_capabilities(ServerCapabilities::default()));
    let client = ready_client(transport.clone(), ServerCapabilities::default()).await;
    assert!(client.semantic_tokens_full(uri("/a.rs")).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn selection_range_gated_on_selection_range_provider() {
    let transport = Arc::new(InitRecordingTransport::with_capabilities(ServerCapabilities::default()));
    let client = ready_client(transport.clone(), ServerCapabilities::default()).await;
    assert!(client
        .selection_range(uri("/a.rs"), vec![Position::new(0, 0)])
        .await
        .unwrap()
        .is_none());
}

#[tokio::test(start_paused = true)]
async fn prepare_call_hierarchy_gated_on_call_hierarchy_provider() {
    let transport = Arc::new(InitRecordingTransport::with_capabilities(ServerCapabilities::default()));
    let client = ready_client(transport.clone(), ServerCapabilities::default()).await;
    assert!(client
        .prepare_call_hierarchy(uri("/a.rs"), Position::new(0, 0))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test(start_paused = true)]
async fn incoming_calls_errors_when_call_hierarchy_unsupported() {
    let transport = Arc::new(InitRecordingTransport::with_capabilities(ServerCapabilities::default()));
    let client = ready_client(transport.clone(), ServerCapabilities::default()).await;
    let item = lsp_types::CallHierarchyItem {
        name: "f".into(),
        kind: lsp_types::SymbolKind::FUNCTION,
        tags: None,
        detail: None,
        uri: uri("/a.rs"),
        range: Range::default(),
        selection_range: Range::default(),
        data: None,
    };
    let result = client.incoming_calls(item).await;
    assert!(matches!(result, Err(crate::error::Error::CapabilityNotSupported { .. })));
}
