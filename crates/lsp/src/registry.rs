//! The Server Supervisor: owns which language maps to which running server,
//! spawns on first use, memoizes failures, and recycles servers on an
//! interval.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tokio::sync::Mutex as AsyncMutex;

use crate::client::transport::{LspTransport, ServerConfig, StartedServer};
use crate::error::{Error, Result};
use crate::ids::LanguageServerId;

const INITIALIZE_TIMEOUT: Duration = Duration::from_secs(10);
const READY_QUIET_PERIOD: Duration = Duration::from_secs(3);

/// Per-language server configuration. Mirrors
/// [`crate::config::ServerDescriptor`] but is the type callers construct by
/// hand (tests, and a config loader translating from
/// [`crate::config::ServerDescriptorSpec`]).
#[derive(Debug, Clone)]
pub struct LanguageServerConfig {
    pub command: String,
    pub args: Vec<String>,
    pub root_dir: PathBuf,
    pub restart_interval: Option<Duration>,
    pub init_options: Option<JsonValue>,
    pub env: Option<HashMap<String, String>>,
}

impl Default for LanguageServerConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            args: Vec::new(),
            root_dir: PathBuf::from("."),
            restart_interval: None,
            init_options: None,
            env: None,
        }
    }
}

impl LanguageServerConfig {
    fn to_transport_config(&self) -> ServerConfig {
        let mut command = vec![self.command.clone()];
        command.extend(self.args.iter().cloned());
        ServerConfig {
            command,
            root_dir: self.root_dir.clone(),
            env: self.env.clone(),
            init_options: self.init_options.clone(),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Starting,
    Initializing,
    Ready,
}

struct LiveEntry {
    id: LanguageServerId,
    lifecycle: Lifecycle,
    capabilities: JsonValue,
    restart_deadline: Option<Instant>,
}

/// Spawns, initializes, restarts, and memoizes failures for language server
/// processes, one per registered language key.
pub struct LanguageServerRegistry {
    transport: Arc<dyn LspTransport>,
    configs: Mutex<HashMap<String, LanguageServerConfig>>,
    live: Mutex<HashMap<String, LiveEntry>>,
    failed: Mutex<HashMap<String, String>>,
    // Serializes acquisition per language so two racing callers don't both
    // spawn a process for the same key.
    acquire_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl LanguageServerRegistry {
    pub fn new(transport: Arc<dyn LspTransport>) -> Self {
        Self {
            transport,
            configs: Mutex::new(HashMap::new()),
            live: Mutex::new(HashMap::new()),
            failed: Mutex::new(HashMap::new()),
            acquire_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, language: &str, config: LanguageServerConfig) {
        self.configs.lock().insert(language.to_string(), config);
    }

    pub fn clear_failed(&self, language: &str) {
        self.failed.lock().remove(language);
    }

    /// Acquire a ready server for `language`, spawning and initializing it
    /// if this is the first use. Fails fast without spawning if this
    /// language previously failed to start, until [`Self::clear_failed`].
    pub async fn acquire(&self, language: &str) -> Result<LanguageServerId> {
        if let Some(reason) = self.failed.lock().get(language).cloned() {
            return Err(Error::PreviouslyFailed {
                language: language.to_string(),
                reason,
            });
        }

        if let Some(id) = self.live_id_if_due_for_reuse(language) {
            return Ok(id);
        }

        let lock = self
            .acquire_locks
            .lock()
            .entry(language.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Re-check after winning the per-language lock: another task may
        // have just finished spawning while we waited.
        if let Some(id) = self.live_id_if_due_for_reuse(language) {
            return Ok(id);
        }
        if let Some(reason) = self.failed.lock().get(language).cloned() {
            return Err(Error::PreviouslyFailed {
                language: language.to_string(),
                reason,
            });
        }

        let config = self
            .configs
            .lock()
            .get(language)
            .cloned()
            .ok_or_else(|| Error::NoServerForLanguage(language.to_string()))?;

        self.spawn_and_initialize(language, &config).await
    }

    fn live_id_if_due_for_reuse(&self, language: &str) -> Option<LanguageServerId> {
        let mut live = self.live.lock();
        let entry = live.get(language)?;
        if let Some(deadline) = entry.restart_deadline {
            if Instant::now() >= deadline {
                live.remove(language);
                return None;
            }
        }
        Some(entry.id)
    }

    async fn spawn_and_initialize(
        &self,
        language: &str,
        config: &LanguageServerConfig,
    ) -> Result<LanguageServerId> {
        let StartedServer { id } = match self.transport.start(config.to_transport_config()).await {
            Ok(started) => started,
            Err(err) => {
                let mut reason = err.to_string();
                if let Some(hint) = err.install_hint() {
                    reason.push_str(&format!(" — {hint}"));
                }
                self.failed.lock().insert(language.to_string(), reason);
                return Err(err);
            }
        };

        self.live.lock().insert(
            language.to_string(),
            LiveEntry {
                id,
                lifecycle: Lifecycle::Starting,
                capabilities: JsonValue::Null,
                restart_deadline: None,
            },
        );

        let init_params = serde_json::json!({
            "processId": std::process::id(),
            "rootUri": crate::uri::uri_from_path(&config.root_dir).ok().map(|u| u.as_str().to_string()),
            "capabilities": client_capabilities(),
            "initializationOptions": config.init_options,
        });

        if let Some(entry) = self.live.lock().get_mut(language) {
            entry.lifecycle = Lifecycle::Initializing;
        }

        let response = self
            .transport
            .request(
                id,
                codebridge_rpc::AnyRequest {
                    id: codebridge_rpc::RequestId::Number(0),
                    method: "initialize".to_string(),
                    params: init_params,
                },
                Some(INITIALIZE_TIMEOUT),
            )
            .await;

        let response = match response {
            Ok(r) => r,
            Err(err) => {
                self.live.lock().remove(language);
                self.failed.lock().insert(language.to_string(), err.to_string());
                return Err(Error::InitializationTimedOut(id));
            }
        };

        let capabilities = response
            .payload
            .map_err(|e| Error::Protocol(e.message))?
            .get("capabilities")
            .cloned()
            .unwrap_or(JsonValue::Null);

        let _ = self
            .transport
            .notify(
                id,
                codebridge_rpc::AnyNotification {
                    method: "initialized".to_string(),
                    params: serde_json::json!({}),
                },
            )
            .await;

        // No server-initiated signal marks "done settling in" after
        // `initialized`, so we wait out the full quiet period before
        // declaring the server ready.
        tokio::time::sleep(READY_QUIET_PERIOD).await;

        let restart_deadline = config.restart_interval.map(|d| Instant::now() + d);
        if let Some(entry) = self.live.lock().get_mut(language) {
            entry.lifecycle = Lifecycle::Ready;
            entry.capabilities = capabilities;
            entry.restart_deadline = restart_deadline;
        }

        Ok(id)
    }

    /// Terminate the live instance(s) for the given languages (all, if
    /// empty) without respawning. The next `acquire` spawns fresh.
    pub async fn restart_servers(&self, languages: &[String]) -> Result<Vec<LanguageServerId>> {
        let targets: Vec<(String, LanguageServerId)> = {
            let live = self.live.lock();
            live.iter()
                .filter(|(lang, _)| languages.is_empty() || languages.contains(lang))
                .map(|(lang, entry)| (lang.clone(), entry.id))
                .collect()
        };
        for (lang, id) in &targets {
            let _ = self.transport.stop(*id).await;
            self.live.lock().remove(lang);
        }
        Ok(targets.into_iter().map(|(_, id)| id).collect())
    }

    /// A [`crate::client::api::ClientHandle`] bound to `language`'s current
    /// live server, if one has been acquired (by [`Self::acquire`], usually
    /// via [`crate::sync::DocumentSync::open_document`]). `path` is accepted
    /// for a future multi-root-dir routing scheme but does not affect the
    /// answer today — a single server instance is shared by all documents
    /// under a language.
    pub fn get(self: &Arc<Self>, language: &str, _path: &Path) -> Option<crate::client::api::ClientHandle> {
        let id = self.live.lock().get(language)?.id;
        Some(crate::client::api::ClientHandle::new(self.clone(), language.to_string(), id))
    }

    pub(crate) fn is_ready_for(&self, language: &str, server: LanguageServerId) -> bool {
        self.live
            .lock()
            .get(language)
            .map(|e| e.id == server && e.lifecycle == Lifecycle::Ready)
            .unwrap_or(false)
    }

    pub(crate) fn transport(&self) -> &Arc<dyn LspTransport> {
        &self.transport
    }

    pub fn capabilities(&self, language: &str) -> JsonValue {
        self.live
            .lock()
            .get(language)
            .map(|e| e.capabilities.clone())
            .unwrap_or(JsonValue::Null)
    }

    /// Dotted-path capability lookup, e.g. `"definitionProvider"` or
    /// `"workspace.fileOperations.willRename"`. Missing keys and explicit
    /// `false` both mean "unsupported".
    pub fn supports(&self, language: &str, capability_path: &str) -> bool {
        let root = self.capabilities(language);
        let mut cursor = &root;
        for segment in capability_path.split('.') {
            match cursor.get(segment) {
                Some(value) => cursor = value,
                None => return false,
            }
        }
        !matches!(cursor, JsonValue::Null) && cursor != &JsonValue::Bool(false)
    }
}

fn client_capabilities() -> JsonValue {
    serde_json::json!({
        "textDocument": {
            "synchronization": {"dynamicRegistration": false},
            "definition": {"dynamicRegistration": false},
            "references": {"dynamicRegistration": false},
            "rename": {"dynamicRegistration": false, "prepareSupport": true},
            "documentSymbol": {"hierarchicalDocumentSymbolSupport": true},
            "completion": {"completionItem": {"snippetSupport": true}},
            "hover": {"dynamicRegistration": false},
            "publishDiagnostics": {"relatedInformation": true},
            "diagnostic": {"dynamicRegistration": false},
        },
        "workspace": {
            "workspaceEdit": {"documentChanges": false},
            "workspaceFolders": true,
        },
    })
}
