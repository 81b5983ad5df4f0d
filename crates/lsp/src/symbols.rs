//! Symbol & Position Services: flattening `textDocument/documentSymbol`'s
//! hierarchical-or-flat response shape, name/kind filtering, and locating
//! the name token within a containing range for rename/reference anchoring.

use codebridge_rpc::AnyRequest;
use lsp_types::{DocumentSymbol, Position, Range, SymbolInformation, SymbolKind, Uri};
use serde_json::json;

use crate::client::transport::LspTransport;
use crate::error::{Error, Result};
use crate::ids::LanguageServerId;

/// A symbol result normalized away from the two incompatible shapes a
/// server may answer `documentSymbol` with (nested `DocumentSymbol` or flat
/// `SymbolInformation`), and away from workspace symbol search.
#[derive(Debug, Clone)]
pub struct FlatSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub range: Range,
    pub selection_range: Range,
    pub container_name: Option<String>,
}

pub async fn document_symbols(
    transport: &dyn LspTransport,
    server: LanguageServerId,
    uri: &Uri,
) -> Result<Vec<FlatSymbol>> {
    let request = AnyRequest {
        id: codebridge_rpc::RequestId::Number(0),
        method: "textDocument/documentSymbol".to_string(),
        params: json!({"textDocument": {"uri": uri.as_str()}}),
    };
    let response = transport.request(server, request, None).await?;
    let payload = response.payload.map_err(|e| Error::Protocol(e.message))?;

    if payload.is_null() {
        return Ok(Vec::new());
    }

    // Disambiguate the two response shapes by whether the first element
    // carries a `range` (DocumentSymbol, nested) or a `location` (flat
    // SymbolInformation) field.
    let is_hierarchical = payload
        .as_array()
        .and_then(|items| items.first())
        .map(|item| item.get("range").is_some())
        .unwrap_or(false);

    if is_hierarchical {
        let symbols: Vec<DocumentSymbol> = serde_json::from_value(payload)?;
        let mut flat = Vec::new();
        flatten_hierarchical(&symbols, None, &mut flat);
        Ok(flat)
    } else {
        let symbols: Vec<SymbolInformation> = serde_json::from_value(payload)?;
        Ok(symbols
            .into_iter()
            .map(|s| FlatSymbol {
                name: s.name,
                kind: s.kind,
                range: s.location.range,
                selection_range: s.location.range,
                container_name: s.container_name,
            })
            .collect())
    }
}

fn flatten_hierarchical(symbols: &[DocumentSymbol], parent: Option<&str>, out: &mut Vec<FlatSymbol>) {
    for symbol in symbols {
        out.push(FlatSymbol {
            name: symbol.name.clone(),
            kind: symbol.kind,
            range: symbol.range,
            selection_range: symbol.selection_range,
            container_name: parent.map(str::to_string),
        });
        if let Some(children) = &symbol.children {
            flatten_hierarchical(children, Some(&symbol.name), out);
        }
    }
}

/// Result of [`find_symbols_by_name`]: the matches, plus a warning when the
/// requested `kind` filter had to be dropped because it matched nothing.
#[derive(Debug, Clone)]
pub struct SymbolSearchResult {
    pub symbols: Vec<FlatSymbol>,
    pub warning: Option<String>,
}

/// Search `document_symbols(uri)` for every symbol whose name either
/// matches exactly or contains `name` as a substring, optionally narrowed
/// to a specific `kind`. If the kind filter would yield zero matches but
/// at least one name match exists, the kind filter is dropped and a
/// warning listing the kinds actually observed is attached instead of
/// returning an empty result.
pub async fn find_symbols_by_name(
    transport: &dyn LspTransport,
    server: LanguageServerId,
    uri: &Uri,
    name: &str,
    kind: Option<SymbolKind>,
) -> Result<SymbolSearchResult> {
    let all = document_symbols(transport, server, uri).await?;
    let name_matches: Vec<FlatSymbol> = all
        .into_iter()
        .filter(|s| s.name == name || s.name.contains(name))
        .collect();

    let Some(kind) = kind else {
        return Ok(SymbolSearchResult { symbols: name_matches, warning: None });
    };

    let kind_filtered: Vec<FlatSymbol> = name_matches.iter().filter(|s| s.kind == kind).cloned().collect();

    if kind_filtered.is_empty() && !name_matches.is_empty() {
        let mut observed: Vec<String> = name_matches.iter().map(|s| symbol_kind_label(s.kind)).collect();
        observed.sort();
        observed.dedup();
        let warning = format!(
            "no symbols named {name:?} matched kind {}; showing all kinds observed instead: {}",
            symbol_kind_label(kind),
            observed.join(", ")
        );
        return Ok(SymbolSearchResult { symbols: name_matches, warning: Some(warning) });
    }

    Ok(SymbolSearchResult { symbols: kind_filtered, warning: None })
}

fn symbol_kind_label(kind: SymbolKind) -> String {
    let label = match kind {
        SymbolKind::FILE => "file",
        SymbolKind::MODULE => "module",
        SymbolKind::NAMESPACE => "namespace",
        SymbolKind::PACKAGE => "package",
        SymbolKind::CLASS => "class",
        SymbolKind::METHOD => "method",
        SymbolKind::PROPERTY => "property",
        SymbolKind::FIELD => "field",
        SymbolKind::CONSTRUCTOR => "constructor",
        SymbolKind::ENUM => "enum",
        SymbolKind::INTERFACE => "interface",
        SymbolKind::FUNCTION => "function",
        SymbolKind::VARIABLE => "variable",
        SymbolKind::CONSTANT => "constant",
        SymbolKind::STRING => "string",
        SymbolKind::NUMBER => "number",
        SymbolKind::BOOLEAN => "boolean",
        SymbolKind::ARRAY => "array",
        SymbolKind::OBJECT => "object",
        SymbolKind::KEY => "key",
        SymbolKind::NULL => "null",
        SymbolKind::ENUM_MEMBER => "enum_member",
        SymbolKind::STRUCT => "struct",
        SymbolKind::EVENT => "event",
        SymbolKind::OPERATOR => "operator",
        SymbolKind::TYPE_PARAMETER => "type_parameter",
        _ => return format!("{kind:?}").to_ascii_lowercase(),
    };
    label.to_string()
}

/// Position of `name`'s first occurrence, for anchoring a `rename` or
/// `references` request. Hierarchical `DocumentSymbol` results already
/// carry a precise `selection_range` distinct from the symbol's enclosing
/// `range`, so that is returned unscanned. Flat `SymbolInformation` results
/// only ever carry the symbol's enclosing `range` (mirrored into
/// `selection_range` by [`document_symbols`]), so `text` is scanned line by
/// line within `[range.start.line, range.end.line]` for the name's first
/// occurrence — clamped by `range.start.character` on the first line and
/// `range.end.character` on the last — falling back to `range.start` if
/// the name is never found.
pub fn position_of_name_in_symbol(symbol: &FlatSymbol, text: &str) -> Position {
    if symbol.selection_range != symbol.range {
        return symbol.selection_range.start;
    }
    scan_for_name(symbol, text)
}

fn scan_for_name(symbol: &FlatSymbol, text: &str) -> Position {
    let lines: Vec<&str> = text.lines().collect();
    let start_line = symbol.range.start.line as usize;
    let end_line = symbol.range.end.line as usize;

    for line_idx in start_line..=end_line {
        let Some(line) = lines.get(line_idx) else {
            break;
        };
        let units: Vec<u16> = line.encode_utf16().collect();
        let lo = if line_idx == start_line { symbol.range.start.character as usize } else { 0 };
        let hi = if line_idx == end_line {
            (symbol.range.end.character as usize).min(units.len())
        } else {
            units.len()
        };
        if lo > hi || lo > units.len() {
            continue;
        }

        let slice = String::from_utf16_lossy(&units[lo..hi]);
        if let Some(byte_idx) = slice.find(symbol.name.as_str()) {
            let char_offset = slice[..byte_idx].encode_utf16().count() as u32;
            return Position::new(line_idx as u32, lo as u32 + char_offset);
        }
    }

    symbol.range.start
}

pub async fn search_workspace_symbols(
    transport: &dyn LspTransport,
    server: LanguageServerId,
    query: &str,
) -> Result<Vec<FlatSymbol>> {
    let request = AnyRequest {
        id: codebridge_rpc::RequestId::Number(0),
        method: "workspace/symbol".to_string(),
        params: json!({"query": query}),
    };
    let response = transport.request(server, request, None).await?;
    let payload = response.payload.map_err(|e| Error::Protocol(e.message))?;
    if payload.is_null() {
        return Ok(Vec::new());
    }
    let symbols: Vec<SymbolInformation> = serde_json::from_value(payload)?;
    Ok(symbols
        .into_iter()
        .map(|s| FlatSymbol {
            name: s.name,
            kind: s.kind,
            range: s.location.range,
            selection_range: s.location.range,
            container_name: s.container_name,
        })
        .collect())
}
