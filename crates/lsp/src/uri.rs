//! Path/URI conversion and the closed extension-to-language-id table.
//!
//! Path-to-URI conversion is delegated to `codebridge_edit::uri`, which the
//! Workspace Edit Applier already needs to get right (symlink-preserving,
//! percent-encoded); this module only adds the `lsp_types::Uri` wrapper type
//! the rest of the LSP layer speaks.

use std::path::{Path, PathBuf};

use lsp_types::Uri;

use crate::error::{Error, Result};

pub fn uri_from_path(path: &Path) -> Result<Uri> {
    let url = codebridge_edit::uri::path_to_uri(path).map_err(|_| {
        Error::Protocol(format!("could not convert {} to a file URI", path.display()))
    })?;
    url.as_str()
        .parse::<Uri>()
        .map_err(|_| Error::Protocol(format!("invalid URI produced for {}", path.display())))
}

pub fn path_from_uri(uri: &Uri) -> Result<PathBuf> {
    let url = url::Url::parse(uri.as_str())
        .map_err(|_| Error::Protocol(format!("invalid URI {}", uri.as_str())))?;
    codebridge_edit::uri::uri_to_path(&url)
        .map_err(|_| Error::Protocol(format!("URI {} is not a file:// path", uri.as_str())))
}

/// Closed extension → LSP `languageId` table. Extensions are matched
/// case-insensitively; an unrecognized extension falls back to `"plaintext"`
/// rather than failing `didOpen`.
pub fn language_id_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "rs" => "rust",
        "toml" => "toml",
        "json" | "jsonc" => "json",
        "yaml" | "yml" => "yaml",
        "md" | "markdown" => "markdown",
        "py" | "pyi" => "python",
        "js" | "mjs" | "cjs" => "javascript",
        "ts" | "mts" | "cts" => "typescript",
        "jsx" => "javascriptreact",
        "tsx" => "typescriptreact",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" | "hxx" => "cpp",
        "go" => "go",
        "rb" => "ruby",
        "sh" | "bash" | "zsh" => "shellscript",
        "css" => "css",
        "scss" => "scss",
        "html" | "htm" => "html",
        "xml" => "xml",
        "sql" => "sql",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "php" => "php",
        "cs" => "csharp",
        "lua" => "lua",
        "nix" => "nix",
        _ => "plaintext",
    }
}

/// Lowercased extension of a path's file name, or `""` if it has none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}
