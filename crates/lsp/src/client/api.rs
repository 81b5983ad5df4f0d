//! The typed client surface handed out by
//! [`crate::registry::LanguageServerRegistry::get`]. Every request here is
//! capability-gated: if the server never advertised the relevant provider,
//! the call returns `Ok(None)` without touching the wire, mirroring how a
//! well-behaved LSP client avoids sending requests a server rejected up
//! front.

use std::sync::Arc;

use codebridge_rpc::{AnyNotification, AnyRequest, RequestId};
use lsp_types::{
    CallHierarchyIncomingCall, CallHierarchyItem, CallHierarchyOutgoingCall, CodeAction,
    CodeActionContext, CodeActionOrCommand, CompletionResponse, DocumentDiagnosticReportResult,
    DocumentLink, DocumentSymbolResponse, FileCreate, FileDelete, FileRename, FoldingRange,
    FormattingOptions, GotoDefinitionResponse, Hover, InlayHint, Location, Position,
    PrepareRenameResponse, Range, SelectionRange, SemanticTokensResult, SignatureHelp,
    TextEdit, Uri, WorkspaceEdit,
};
use serde_json::{json, Value as JsonValue};

use crate::error::{Error, Result};
use crate::ids::LanguageServerId;
use crate::registry::LanguageServerRegistry;

/// Bound to one language's current live server at the moment it was handed
/// out by [`LanguageServerRegistry::get`]. Holding onto a `ClientHandle`
/// across a server restart is safe but every call re-checks liveness, so
/// calls made against a since-restarted server fail with
/// [`Error::ServerExited`] rather than silently talking to the wrong
/// process.
pub struct ClientHandle {
    registry: Arc<LanguageServerRegistry>,
    language: String,
    server: LanguageServerId,
}

impl ClientHandle {
    pub(crate) fn new(registry: Arc<LanguageServerRegistry>, language: String, server: LanguageServerId) -> Self {
        Self { registry, language, server }
    }

    pub fn is_initialized(&self) -> bool {
        self.registry.is_ready_for(&self.language, self.server)
    }

    fn supports(&self, capability_path: &str) -> bool {
        self.registry.supports(&self.language, capability_path)
    }

    pub fn supports_prepare_rename(&self) -> bool {
        self.supports("renameProvider.prepareProvider")
    }

    pub fn supports_pull_diagnostics(&self) -> bool {
        self.supports("diagnosticProvider")
    }

    pub fn supports_inlay_hint(&self) -> bool {
        self.supports("inlayHintProvider")
    }

    pub fn supports_inlay_hint_resolve(&self) -> bool {
        self.supports("inlayHintProvider.resolveProvider")
    }

    pub fn supports_code_action_resolve(&self) -> bool {
        self.supports("codeActionProvider.resolveProvider")
    }

    async fn request<T: serde::de::DeserializeOwned>(&self, method: &str, params: JsonValue) -> Result<T> {
        let req = AnyRequest { id: RequestId::Number(0), method: method.to_string(), params };
        let response = self
            .registry
            .transport()
            .request(self.server, req, None)
            .await?;
        let payload = response.payload.map_err(|e| Error::Protocol(e.message))?;
        Ok(serde_json::from_value(payload)?)
    }

    async fn notify(&self, method: &str, params: JsonValue) -> Result<()> {
        self.registry
            .transport()
            .notify(self.server, AnyNotification { method: method.to_string(), params })
            .await
    }

    fn guard(&self, capability_path: &str) -> Result<()> {
        if self.supports(capability_path) {
            Ok(())
        } else {
            Err(Error::CapabilityNotSupported { capability: capability_path.to_string() })
        }
    }

    fn text_document_position(uri: &Uri, position: Position) -> JsonValue {
        json!({"textDocument": {"uri": uri.as_str()}, "position": position})
    }

    pub async fn goto_definition(&self, uri: Uri, position: Position) -> Result<Option<GotoDefinitionResponse>> {
        if !self.supports("definitionProvider") {
            return Ok(None);
        }
        self.request("textDocument/definition", Self::text_document_position(&uri, position)).await
    }

    pub async fn goto_declaration(&self, uri: Uri, position: Position) -> Result<Option<GotoDefinitionResponse>> {
        if !self.supports("declarationProvider") {
            return Ok(None);
        }
        self.request("textDocument/declaration", Self::text_document_position(&uri, position)).await
    }

    pub async fn goto_implementation(&self, uri: Uri, position: Position) -> Result<Option<GotoDefinitionResponse>> {
        if !self.supports("implementationProvider") {
            return Ok(None);
        }
        self.request("textDocument/implementation", Self::text_document_position(&uri, position)).await
    }

    pub async fn goto_type_definition(&self, uri: Uri, position: Position) -> Result<Option<GotoDefinitionResponse>> {
        if !self.supports("typeDefinitionProvider") {
            return Ok(None);
        }
        self.request("textDocument/typeDefinition", Self::text_document_position(&uri, position)).await
    }

    pub async fn references(
        &self,
        uri: Uri,
        position: Position,
        include_declaration: bool,
    ) -> Result<Option<Vec<Location>>> {
        if !self.supports("referencesProvider") {
            return Ok(None);
        }
        let mut params = Self::text_document_position(&uri, position);
        params["context"] = json!({"includeDeclaration": include_declaration});
        self.request("textDocument/references", params).await
    }

    pub async fn hover(&self, uri: Uri, position: Position) -> Result<Option<Hover>> {
        if !self.supports("hoverProvider") {
            return Ok(None);
        }
        self.request("textDocument/hover", Self::text_document_position(&uri, position)).await
    }

    pub async fn completion(&self, uri: Uri, position: Position) -> Result<Option<CompletionResponse>> {
        if !self.supports("completionProvider") {
            return Ok(None);
        }
        self.request("textDocument/completion", Self::text_document_position(&uri, position)).await
    }

    pub async fn signature_help(&self, uri: Uri, position: Position) -> Result<Option<SignatureHelp>> {
        if !self.supports("signatureHelpProvider") {
            return Ok(None);
        }
        self.request("textDocument/signatureHelp", Self::text_document_position(&uri, position)).await
    }

    pub async fn document_symbol(&self, uri: Uri) -> Result<Option<DocumentSymbolResponse>> {
        if !self.supports("documentSymbolProvider") {
            return Ok(None);
        }
        self.request("textDocument/documentSymbol", json!({"textDocument": {"uri": uri.as_str()}})).await
    }

    pub async fn prepare_rename(&self, uri: Uri, position: Position) -> Result<Option<PrepareRenameResponse>> {
        if !self.supports_prepare_rename() {
            return Ok(None);
        }
        self.request("textDocument/prepareRename", Self::text_document_position(&uri, position)).await
    }

    pub async fn rename(&self, uri: Uri, position: Position, new_name: String) -> Result<Option<WorkspaceEdit>> {
        if !self.supports("renameProvider") {
            return Ok(None);
        }
        let mut params = Self::text_document_position(&uri, position);
        params["newName"] = json!(new_name);
        self.request("textDocument/rename", params).await
    }

    pub async fn formatting(&self, uri: Uri, options: FormattingOptions) -> Result<Option<Vec<TextEdit>>> {
        if !self.supports("documentFormattingProvider") {
            return Ok(None);
        }
        self.request(
            "textDocument/formatting",
            json!({"textDocument": {"uri": uri.as_str()}, "options": options}),
        )
        .await
    }

    pub async fn range_formatting(
        &self,
        uri: Uri,
        range: Range,
        options: FormattingOptions,
    ) -> Result<Option<Vec<TextEdit>>> {
        if !self.supports("documentRangeFormattingProvider") {
            return Ok(None);
        }
        self.request(
            "textDocument/rangeFormatting",
            json!({"textDocument": {"uri": uri.as_str()}, "range": range, "options": options}),
        )
        .await
    }

    pub async fn code_action(
        &self,
        uri: Uri,
        range: Range,
        context: CodeActionContext,
    ) -> Result<Option<Vec<CodeActionOrCommand>>> {
        if !self.supports("codeActionProvider") {
            return Ok(None);
        }
        self.request(
            "textDocument/codeAction",
            json!({"textDocument": {"uri": uri.as_str()}, "range": range, "context": context}),
        )
        .await
    }

    pub async fn code_action_resolve(&self, action: CodeAction) -> Result<CodeAction> {
        self.guard("codeActionProvider.resolveProvider")?;
        self.request("codeAction/resolve", serde_json::to_value(action)?).await
    }

    pub async fn execute_command(
        &self,
        command: String,
        arguments: Option<Vec<JsonValue>>,
    ) -> Result<Option<JsonValue>> {
        self.guard("executeCommandProvider")?;
        self.request(
            "workspace/executeCommand",
            json!({"command": command, "arguments": arguments}),
        )
        .await
    }

    pub async fn folding_range(&self, uri: Uri) -> Result<Option<Vec<FoldingRange>>> {
        if !self.supports("foldingRangeProvider") {
            return Ok(None);
        }
        self.request("textDocument/foldingRange", json!({"textDocument": {"uri": uri.as_str()}})).await
    }

    pub async fn document_link(&self, uri: Uri) -> Result<Option<Vec<DocumentLink>>> {
        if !self.supports("documentLinkProvider") {
            return Ok(None);
        }
        self.request("textDocument/documentLink", json!({"textDocument": {"uri": uri.as_str()}})).await
    }

    pub async fn inlay_hints(&self, uri: Uri, range: Range) -> Result<Option<Vec<InlayHint>>> {
        if !self.supports_inlay_hint() {
            return Ok(None);
        }
        self.request(
            "textDocument/inlayHint",
            json!({"textDocument": {"uri": uri.as_str()}, "range": range}),
        )
        .await
    }

    pub async fn inlay_hint_resolve(&self, hint: InlayHint) -> Result<InlayHint> {
        self.guard("inlayHintProvider.resolveProvider")?;
        self.request("inlayHint/resolve", serde_json::to_value(hint)?).await
    }

    pub async fn semantic_tokens_full(&self, uri: Uri) -> Result<Option<SemanticTokensResult>> {
        if !self.supports("semanticTokensProvider") {
            return Ok(None);
        }
        self.request("textDocument/semanticTokens/full", json!({"textDocument": {"uri": uri.as_str()}})).await
    }

    pub async fn selection_range(&self, uri: Uri, positions: Vec<Position>) -> Result<Option<Vec<SelectionRange>>> {
        if !self.supports("selectionRangeProvider") {
            return Ok(None);
        }
        self.request(
            "textDocument/selectionRange",
            json!({"textDocument": {"uri": uri.as_str()}, "positions": positions}),
        )
        .await
    }

    pub async fn prepare_call_hierarchy(
        &self,
        uri: Uri,
        position: Position,
    ) -> Result<Option<Vec<CallHierarchyItem>>> {
        if !self.supports("callHierarchyProvider") {
            return Ok(None);
        }
        self.request("textDocument/prepareCallHierarchy", Self::text_document_position(&uri, position)).await
    }

    pub async fn incoming_calls(&self, item: CallHierarchyItem) -> Result<Option<Vec<CallHierarchyIncomingCall>>> {
        self.guard("callHierarchyProvider")?;
        self.request("callHierarchy/incomingCalls", json!({"item": item})).await
    }

    pub async fn outgoing_calls(&self, item: CallHierarchyItem) -> Result<Option<Vec<CallHierarchyOutgoingCall>>> {
        self.guard("callHierarchyProvider")?;
        self.request("callHierarchy/outgoingCalls", json!({"item": item})).await
    }

    pub async fn pull_diagnostics(
        &self,
        uri: Uri,
        previous_result_id: Option<String>,
    ) -> Result<Option<DocumentDiagnosticReportResult>> {
        if !self.supports_pull_diagnostics() {
            return Ok(None);
        }
        self.request(
            "textDocument/diagnostic",
            json!({"textDocument": {"uri": uri.as_str()}, "previousResultId": previous_result_id}),
        )
        .await
    }

    pub async fn will_rename_files(&self, renames: Vec<FileRename>) -> Result<Option<WorkspaceEdit>> {
        if !self.supports("workspace.fileOperations.willRename") {
            return Ok(None);
        }
        self.request("workspace/willRenameFiles", json!({"files": renames})).await
    }

    pub async fn did_rename_files(&self, renames: Vec<FileRename>) -> Result<()> {
        if !self.supports("workspace.fileOperations.didRename") {
            return Ok(());
        }
        self.notify("workspace/didRenameFiles", json!({"files": renames})).await
    }

    pub async fn will_create_files(&self, creates: Vec<FileCreate>) -> Result<Option<WorkspaceEdit>> {
        if !self.supports("workspace.fileOperations.willCreate") {
            return Ok(None);
        }
        self.request("workspace/willCreateFiles", json!({"files": creates})).await
    }

    pub async fn did_create_files(&self, creates: Vec<FileCreate>) -> Result<()> {
        if !self.supports("workspace.fileOperations.didCreate") {
            return Ok(());
        }
        self.notify("workspace/didCreateFiles", json!({"files": creates})).await
    }

    pub async fn will_delete_files(&self, deletes: Vec<FileDelete>) -> Result<Option<WorkspaceEdit>> {
        if !self.supports("workspace.fileOperations.willDelete") {
            return Ok(None);
        }
        self.request("workspace/willDeleteFiles", json!({"files": deletes})).await
    }

    pub async fn did_delete_files(&self, deletes: Vec<FileDelete>) -> Result<()> {
        if !self.supports("workspace.fileOperations.didDelete") {
            return Ok(());
        }
        self.notify("workspace/didDeleteFiles", json!({"files": deletes})).await
    }
}
