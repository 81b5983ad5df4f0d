pub mod api;
pub mod transport;

pub use api::ClientHandle;
pub use transport::{LspTransport, ServerConfig, StartedServer, TransportEvent};
