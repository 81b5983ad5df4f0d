use crate::ids::LanguageServerId;

/// Error taxonomy for the supervisor and everything built on it. Mirrors
/// `codebridge_rpc::Error` at the transport boundary but adds the
/// server-lifecycle and routing failures that only make sense once many
/// servers are in play.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no language server configured for extension {0:?}")]
    NoServerForExtension(String),

    #[error("no language server registered for language {0:?}")]
    NoServerForLanguage(String),

    #[error(
        "language server for {language:?} previously failed to start ({reason}); not retrying until cleared"
    )]
    PreviouslyFailed { language: String, reason: String },

    #[error("failed to spawn language server for {language:?}: {source}")]
    Spawn {
        language: String,
        #[source]
        source: std::io::Error,
        install_hint: Option<&'static str>,
    },

    #[error("language server {0} did not acknowledge initialization in time")]
    InitializationTimedOut(LanguageServerId),

    #[error("language server {0} exited")]
    ServerExited(LanguageServerId),

    #[error("capability {capability:?} is not supported by this server")]
    CapabilityNotSupported { capability: String },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Rpc(#[from] codebridge_rpc::Error),

    #[error(transparent)]
    Edit(#[from] codebridge_edit::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Install guidance for a [`Error::Spawn`] failure, if `command` is one
    /// of the LSP binaries this crate knows how to point a user at. `None`
    /// both for unrecognized commands and for every other error variant.
    pub fn install_hint(&self) -> Option<&'static str> {
        match self {
            Error::Spawn { install_hint, .. } => *install_hint,
            _ => None,
        }
    }
}

/// Closed table of install guidance for LSP binaries this crate knows how
/// to launch. `command` is matched on its file name so a configured
/// absolute path (e.g. `/opt/bin/gopls`) still resolves. Spawn failures for
/// anything outside this table still surface (via [`std::io::Error`]),
/// just without a hint attached.
pub fn spawn_install_hint(command: &str) -> Option<&'static str> {
    let name = std::path::Path::new(command)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(command);

    match name {
        "typescript-language-server" => {
            Some("install with `npm install -g typescript-language-server typescript`")
        }
        "pylsp" => Some("install with `pip install python-lsp-server`"),
        "pyright" | "pyright-langserver" => Some("install with `npm install -g pyright`"),
        "gopls" => Some("install with `go install golang.org/x/tools/gopls@latest`"),
        "rust-analyzer" => Some("install with `rustup component add rust-analyzer`"),
        "clangd" => Some("install via your system package manager (e.g. `apt install clangd`) or the LLVM release page"),
        "lua-language-server" => Some("install via your system package manager or https://github.com/LuaLS/lua-language-server/releases"),
        "solargraph" => Some("install with `gem install solargraph`"),
        "vscode-json-language-server" => Some("install with `npm install -g vscode-langservers-extracted`"),
        "yaml-language-server" => Some("install with `npm install -g yaml-language-server`"),
        "jdtls" => Some("install via your system package manager or https://download.eclipse.org/jdtls/"),
        "intelephense" => Some("install with `npm install -g intelephense`"),
        _ => None,
    }
}
