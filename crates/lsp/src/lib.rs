//! Language server process supervision, document session tracking, and
//! diagnostic reconciliation: the half of an editor's LSP integration that
//! has nothing to do with rendering or input, and everything to do with
//! keeping one or more `rust-analyzer`-shaped child processes honest.

pub mod capability;
pub mod client;
pub mod config;
pub mod diagnostics;
pub mod documents;
pub mod error;
pub mod ids;
pub mod logging;
pub mod registry;
pub mod sync;
pub mod uri;

pub use client::{ClientHandle, LspTransport, ServerConfig, StartedServer, TransportEvent};
pub use codebridge_rpc::{AnyNotification, AnyRequest, AnyResponse, Engine, JsonValue, PeerMessage, RequestId, ResponseError};
pub use config::{ServerConfigDocument, ServerDescriptor, ServerDescriptorSpec};
pub use documents::DocumentStore;
pub use error::{Error, Result};
pub use ids::LanguageServerId;
pub use registry::{LanguageServerConfig, LanguageServerRegistry};
pub use sync::{ChangeRequest, DocumentSync};

/// Convenience re-export so callers (and this crate's own tests) can write
/// `crate::uri_from_path` instead of reaching into the `uri` module.
pub fn uri_from_path(path: &std::path::Path) -> Result<lsp_types::Uri> {
    uri::uri_from_path(path)
}
