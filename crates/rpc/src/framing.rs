//! `Content-Length` framing for JSON-RPC over a byte stream, matching the
//! header block LSP servers speak on stdio.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

/// Refuse to allocate a read buffer larger than this for a single message.
/// Guards against a corrupt or hostile `Content-Length` header.
pub const MAX_MESSAGE_LEN: usize = 64 * 1024 * 1024;

/// Read one complete framed message from `reader`, returning its raw body
/// bytes. Returns `Err(Error::Closed)` on a clean EOF before any header
/// bytes were read; a partial read is `Error::Io`.
pub async fn read_message<R>(reader: &mut R) -> Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    // Once a header line is found to be malformed we no longer trust
    // `content_length`, but we still have to read through to the blank-line
    // separator so the next call starts at the next message's header block
    // instead of mis-reading these header bytes as a frame body.
    let mut malformed: Option<String> = None;

    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(Error::Closed);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            break;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                let value = value.trim();
                match value.parse::<usize>() {
                    Ok(len) => content_length = Some(len),
                    Err(_) => {
                        malformed.get_or_insert_with(|| format!("non-numeric Content-Length: {value:?}"));
                    }
                }
            }
            // Other headers (e.g. Content-Type) are accepted and ignored.
        } else {
            malformed.get_or_insert_with(|| trimmed.to_string());
        }
    }

    if let Some(reason) = malformed {
        return Err(Error::MalformedHeader(reason));
    }

    let len = content_length
        .ok_or_else(|| Error::MalformedHeader("missing Content-Length".to_string()))?;
    if len > MAX_MESSAGE_LEN {
        return Err(Error::FrameTooLarge(len));
    }

    let mut body = vec![0u8; len];
    tokio::io::AsyncReadExt::read_exact(reader, &mut body).await?;
    Ok(body)
}

/// Write `body` to `writer` with a `Content-Length` header, flushing before
/// returning so concurrent writers (serialized by the caller) observe a
/// consistent stream.
pub async fn write_message<W>(writer: &mut W, body: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

// Re-exported so callers constructing a `BufReader` over an arbitrary
// `AsyncRead` don't need to depend on tokio's io module directly.
pub fn buffered<R: AsyncRead>(reader: R) -> tokio::io::BufReader<R> {
    tokio::io::BufReader::new(reader)
}
