//! Request/response correlation and notification dispatch on top of
//! [`crate::framing`]. Transport-agnostic: the caller supplies any
//! `AsyncRead`/`AsyncWrite` pair (a child process's stdio, a socket, an
//! in-memory pipe for tests).

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex as SyncMutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};

use crate::error::{Error, RequestId, Result};
use crate::framing;
use crate::message::{AnyNotification, AnyResponse, Envelope, JsonValue, ResponseError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

type PendingMap = Arc<SyncMutex<HashMap<RequestId, oneshot::Sender<AnyResponse>>>>;

/// One side of a framed JSON-RPC conversation. Owns the writer half and the
/// pending-request table; a background task owns the reader half and feeds
/// both this table and the notification channel.
pub struct Engine {
    writer: Arc<AsyncMutex<Box<dyn AsyncWrite + Send + Unpin>>>,
    next_id: AtomicI64,
    pending: PendingMap,
    reader_task: tokio::task::JoinHandle<()>,
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

impl Engine {
    /// Start the engine: spawns a task that continuously reads framed
    /// messages from `reader` and dispatches them. Notifications and
    /// unsolicited requests from the peer are pushed onto the returned
    /// channel; the caller is expected to drain it.
    pub fn spawn<R, W>(reader: R, writer: W) -> (Self, mpsc::UnboundedReceiver<PeerMessage>)
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let pending: PendingMap = Arc::new(SyncMutex::new(HashMap::new()));
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let pending_for_reader = pending.clone();
        let reader_task = tokio::spawn(async move {
            Self::reader_loop(reader, pending_for_reader, inbound_tx).await;
        });

        let engine = Self {
            writer: Arc::new(AsyncMutex::new(Box::new(writer))),
            next_id: AtomicI64::new(1),
            pending,
            reader_task,
        };
        (engine, inbound_rx)
    }

    async fn reader_loop<R>(
        reader: R,
        pending: PendingMap,
        inbound_tx: mpsc::UnboundedSender<PeerMessage>,
    ) where
        R: AsyncRead + Unpin,
    {
        let mut reader = framing::buffered(reader);
        loop {
            let body = match framing::read_message(&mut reader).await {
                Ok(body) => body,
                Err(Error::Closed) => {
                    tracing::debug!("peer closed the stream");
                    break;
                }
                Err(Error::FrameTooLarge(len)) => {
                    tracing::error!(len, "dropping oversized frame");
                    continue;
                }
                Err(Error::MalformedHeader(reason)) => {
                    tracing::warn!(reason, "discarding malformed header block");
                    continue;
                }
                Err(err) => {
                    tracing::error!(error = %err, "transport error reading frame, ending pump");
                    break;
                }
            };

            let envelope: Envelope = match serde_json::from_slice(&body) {
                Ok(env) => env,
                Err(err) => {
                    tracing::warn!(error = %err, "dropping malformed JSON-RPC message");
                    continue;
                }
            };

            if envelope.is_response() {
                let id = envelope.id.clone().expect("checked by is_response");
                let response = if let Some(error) = envelope.error {
                    AnyResponse::new_err(id.clone(), error)
                } else {
                    AnyResponse::new_ok(id.clone(), envelope.result.unwrap_or(JsonValue::Null))
                };
                let waiter = pending.lock().remove(&id);
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(response);
                    }
                    None => {
                        tracing::debug!(%id, "response for unknown or timed-out request id");
                    }
                }
            } else if envelope.is_notification() {
                let method = envelope.method.expect("checked by is_notification");
                let params = envelope.params.unwrap_or(JsonValue::Null);
                let _ = inbound_tx.send(PeerMessage::Notification(AnyNotification { method, params }));
            } else if envelope.is_request() {
                let id = envelope.id.expect("checked by is_request");
                let method = envelope.method.expect("checked by is_request");
                let params = envelope.params.unwrap_or(JsonValue::Null);
                let _ = inbound_tx.send(PeerMessage::Request(crate::message::AnyRequest { id, method, params }));
            } else {
                tracing::warn!("dropping message with neither method nor result/error");
            }
        }

        // Fail every outstanding waiter: the stream is gone.
        let waiters: Vec<_> = pending.lock().drain().collect();
        for (id, tx) in waiters {
            let _ = tx.send(AnyResponse::new_err(
                id,
                ResponseError {
                    code: -32000,
                    message: "transport closed".to_string(),
                    data: None,
                },
            ));
        }
    }

    fn allocate_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Send a request and await its response, failing after `timeout`
    /// (defaulting to 30s). The request id is removed from the pending table
    /// in every case — success, timeout, or transport closure.
    pub async fn request(
        &self,
        method: impl Into<String>,
        params: JsonValue,
        timeout: Option<Duration>,
    ) -> Result<AnyResponse> {
        let id = self.allocate_id();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id.clone(), tx);

        let envelope = Envelope::request(id.clone(), method.into(), params);
        let body = serde_json::to_vec(&envelope)?;
        {
            let mut writer = self.writer.lock().await;
            if let Err(err) = framing::write_message(&mut *writer, &body).await {
                self.pending.lock().remove(&id);
                return Err(err);
            }
        }

        let deadline = timeout.unwrap_or(DEFAULT_TIMEOUT);
        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(Error::Closed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(Error::Timeout(id))
            }
        }
    }

    /// Send a notification; no response is expected or awaited.
    pub async fn notify(&self, method: impl Into<String>, params: JsonValue) -> Result<()> {
        let envelope = Envelope::notification(method.into(), params);
        let body = serde_json::to_vec(&envelope)?;
        let mut writer = self.writer.lock().await;
        framing::write_message(&mut *writer, &body).await
    }

    /// Reply to a request sent *by the peer* (used when this side also acts
    /// as a server for a handful of client-to-server callbacks such as
    /// `workspace/configuration`).
    pub async fn reply(
        &self,
        id: RequestId,
        payload: std::result::Result<JsonValue, ResponseError>,
    ) -> Result<()> {
        let envelope = match payload {
            Ok(result) => Envelope::response_ok(id, result),
            Err(error) => Envelope::response_err(id, error),
        };
        let body = serde_json::to_vec(&envelope)?;
        let mut writer = self.writer.lock().await;
        framing::write_message(&mut *writer, &body).await
    }
}

/// A message the peer sent that was not a response to one of our requests.
#[derive(Debug, Clone)]
pub enum PeerMessage {
    Notification(AnyNotification),
    Request(crate::message::AnyRequest),
}
