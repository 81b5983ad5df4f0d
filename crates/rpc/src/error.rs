use std::fmt;

/// Error taxonomy for the message pump.
///
/// Variants distinguish message-level failures (which drop one message and
/// keep the stream alive) from stream-level failures (which end the pump).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A header block could not be parsed. The offending bytes are skipped
    /// and the stream continues.
    #[error("malformed message header: {0}")]
    MalformedHeader(String),

    /// The declared `Content-Length` exceeded [`crate::framing::MAX_MESSAGE_LEN`].
    #[error("message of {0} bytes exceeds the maximum frame size")]
    FrameTooLarge(usize),

    /// The body of a message did not parse as JSON. The message is dropped.
    #[error("invalid JSON in message body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The underlying transport ended or errored while reading or writing.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended (EOF) while a header or body was still expected.
    #[error("transport closed")]
    Closed,

    /// A request's deadline elapsed before a response arrived.
    #[error("request {0} timed out")]
    Timeout(RequestId),

    /// A response referenced a request id that is not (or no longer) pending.
    #[error("response for unknown request id {0}")]
    UnknownRequestId(RequestId),

    /// The peer returned a JSON-RPC error object for a request.
    #[error("remote error {code}: {message}")]
    Remote {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// A JSON-RPC request id. The pump only ever allocates the `Number` variant;
/// `String` is accepted on the receive path because some peers echo string ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        RequestId::Number(value)
    }
}
