use std::path::PathBuf;

/// Error taxonomy for applying a workspace edit. Every variant but
/// [`Error::Io`] is a precondition failure caught before any byte is
/// written; `Io` can still occur mid-apply, in which case the caller
/// always gets a full rollback of everything written so far.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{path}: URI does not resolve to a regular file")]
    NotRegularFile { path: PathBuf },

    #[error("{path}: file is not readable: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: file is not valid UTF-8")]
    NotUtf8 { path: PathBuf },

    #[error(
        "{path}: Invalid range ({start_line}:{start_char}) to ({end_line}:{end_char}): {reason}"
    )]
    InvalidRange {
        path: PathBuf,
        start_line: u32,
        start_char: u32,
        end_line: u32,
        end_char: u32,
        reason: String,
    },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{uri}: not a file:// URI")]
    UnsupportedUri { uri: String },
}

pub type Result<T> = std::result::Result<T, Error>;
