//! Transport-agnostic JSON-RPC 2.0 message pump: `Content-Length` framing,
//! request/response correlation, and notification dispatch. Used by
//! `codebridge-lsp` to speak LSP over a child process's stdio, but nothing
//! here is LSP-specific.

pub mod correlation;
pub mod error;
pub mod framing;
pub mod message;

pub use correlation::{Engine, PeerMessage};
pub use error::{Error, RequestId, Result};
pub use message::{AnyNotification, AnyRequest, AnyResponse, Envelope, JsonValue, ResponseError};
