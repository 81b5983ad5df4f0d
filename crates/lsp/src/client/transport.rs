//! Abstraction over "a running language server" so tests can substitute a
//! recording/stub double for a real child process, matching how the rest of
//! the ecosystem's LSP clients are built for testability.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use codebridge_rpc::{AnyNotification, AnyRequest, AnyResponse, Engine, JsonValue, PeerMessage, RequestId, ResponseError};
use parking_lot::Mutex;
use serde_json::Value as Json;
use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};
use crate::ids::LanguageServerId;

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub command: Vec<String>,
    pub root_dir: PathBuf,
    pub env: Option<HashMap<String, String>>,
    pub init_options: Option<Json>,
}

#[derive(Debug, Clone, Copy)]
pub struct StartedServer {
    pub id: LanguageServerId,
}

/// An event the transport produces that was not solicited by a `request`
/// call: a notification or request from the peer, or the server exiting.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Notification {
        server: LanguageServerId,
        notification: AnyNotification,
    },
    Request {
        server: LanguageServerId,
        request: AnyRequest,
    },
    Exited {
        server: LanguageServerId,
    },
}

/// Everything the rest of this crate needs from "a language server
/// process". Implemented by [`ProcessTransport`] in production and by
/// hand-rolled recording/stub doubles in tests.
#[async_trait]
pub trait LspTransport: Send + Sync {
    fn subscribe_events(&self) -> Result<mpsc::UnboundedReceiver<TransportEvent>>;
    async fn start(&self, cfg: ServerConfig) -> Result<StartedServer>;
    async fn notify(&self, server: LanguageServerId, notif: AnyNotification) -> Result<()>;
    async fn notify_with_barrier(
        &self,
        server: LanguageServerId,
        notif: AnyNotification,
    ) -> Result<oneshot::Receiver<Result<()>>>;
    /// `req.id` is a caller-supplied correlation id for transports that
    /// match responses themselves (test doubles); [`ProcessTransport`]
    /// ignores it and lets the underlying `codebridge_rpc::Engine` allocate
    /// its own wire id, since that engine already owns correlation.
    async fn request(
        &self,
        server: LanguageServerId,
        req: AnyRequest,
        timeout: Option<Duration>,
    ) -> Result<AnyResponse>;
    async fn reply(
        &self,
        server: LanguageServerId,
        id: RequestId,
        resp: std::result::Result<JsonValue, ResponseError>,
    ) -> Result<()>;
    async fn stop(&self, server: LanguageServerId) -> Result<()>;
}

struct LiveServer {
    engine: Arc<Engine>,
    child: tokio::process::Child,
    pump_task: tokio::task::JoinHandle<()>,
}

/// Production transport: spawns a real child process per server and speaks
/// JSON-RPC over its stdio via `codebridge_rpc::Engine`.
pub struct ProcessTransport {
    servers: Mutex<HashMap<LanguageServerId, LiveServer>>,
    next_slot: AtomicU32,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<TransportEvent>>>,
}

impl ProcessTransport {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            servers: Mutex::new(HashMap::new()),
            next_slot: AtomicU32::new(1),
            events_tx: tx,
            events_rx: Mutex::new(Some(rx)),
        }
    }
}

impl Default for ProcessTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LspTransport for ProcessTransport {
    fn subscribe_events(&self) -> Result<mpsc::UnboundedReceiver<TransportEvent>> {
        self.events_rx
            .lock()
            .take()
            .ok_or_else(|| Error::Protocol("event stream already taken".to_string()))
    }

    async fn start(&self, cfg: ServerConfig) -> Result<StartedServer> {
        let Some((program, args)) = cfg.command.split_first() else {
            return Err(Error::Protocol("empty server command".to_string()));
        };

        let mut command = tokio::process::Command::new(program);
        command
            .args(args)
            .current_dir(&cfg.root_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(env) = &cfg.env {
            command.env_clear().envs(env);
        }

        let mut child = command.spawn().map_err(|source| Error::Spawn {
            language: program.clone(),
            install_hint: crate::error::spawn_install_hint(program),
            source,
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Protocol("child has no stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Protocol("child has no stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Protocol("child has no stderr".to_string()))?;

        let slot = self.next_slot.fetch_add(1, Ordering::Relaxed);
        let id = LanguageServerId::new(slot, 0);

        tokio::spawn(forward_stderr(id, stderr));

        let (engine, mut inbound) = Engine::spawn(stdout, stdin);
        let events_tx = self.events_tx.clone();
        let pump_task = tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                let event = match message {
                    PeerMessage::Notification(notification) => {
                        TransportEvent::Notification { server: id, notification }
                    }
                    PeerMessage::Request(request) => TransportEvent::Request { server: id, request },
                };
                if events_tx.send(event).is_err() {
                    break;
                }
            }
            let _ = events_tx.send(TransportEvent::Exited { server: id });
        });

        self.servers.lock().insert(
            id,
            LiveServer {
                engine: Arc::new(engine),
                child,
                pump_task,
            },
        );

        Ok(StartedServer { id })
    }

    async fn notify(&self, server: LanguageServerId, notif: AnyNotification) -> Result<()> {
        let engine = self.engine_for(server)?;
        engine.notify(notif.method, notif.params).await?;
        Ok(())
    }

    async fn notify_with_barrier(
        &self,
        server: LanguageServerId,
        notif: AnyNotification,
    ) -> Result<oneshot::Receiver<Result<()>>> {
        let result = self.notify(server, notif).await;
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Ok(rx)
    }

    async fn request(
        &self,
        server: LanguageServerId,
        req: AnyRequest,
        timeout: Option<Duration>,
    ) -> Result<AnyResponse> {
        let engine = self.engine_for(server)?;
        let response = engine.request(req.method, req.params, timeout).await?;
        Ok(response)
    }

    async fn reply(
        &self,
        server: LanguageServerId,
        id: RequestId,
        resp: std::result::Result<JsonValue, ResponseError>,
    ) -> Result<()> {
        let engine = self.engine_for(server)?;
        engine.reply(id, resp).await?;
        Ok(())
    }

    async fn stop(&self, server: LanguageServerId) -> Result<()> {
        if let Some(mut live) = self.servers.lock().remove(&server) {
            live.pump_task.abort();
            let _ = live.child.start_kill();
        }
        Ok(())
    }
}

impl ProcessTransport {
    fn engine_for(&self, server: LanguageServerId) -> Result<Arc<Engine>> {
        self.servers
            .lock()
            .get(&server)
            .map(|live| live.engine.clone())
            .ok_or(Error::ServerExited(server))
    }
}

async fn forward_stderr(server: LanguageServerId, stderr: tokio::process::ChildStderr) {
    use tokio::io::AsyncBufReadExt;
    let mut lines = tokio::io::BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => tracing::debug!(%server, "{line}"),
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(%server, error = %err, "error reading child stderr");
                break;
            }
        }
    }
}
