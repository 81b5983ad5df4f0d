//! Typed shapes for server configuration. Parsing a config file from disk,
//! watching it, and merging CLI flags live outside this crate; this module
//! only owns the JSON schema and the immutable value the registry acts on.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value as JsonValue;

/// One entry of the `servers` array accepted from an external config
/// loader. Field names match the wire JSON (camelCase) via serde rename.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerDescriptorSpec {
    pub extensions: Vec<String>,
    pub command: Vec<String>,
    #[serde(default = "default_root_dir", rename = "rootDir")]
    pub root_dir: PathBuf,
    #[serde(default, rename = "restartInterval")]
    pub restart_interval_minutes: Option<f64>,
    #[serde(default, rename = "initializationOptions")]
    pub init_options: Option<JsonValue>,
    #[serde(default)]
    pub env: Option<HashMap<String, String>>,
}

fn default_root_dir() -> PathBuf {
    PathBuf::from(".")
}

/// The root config document: `{"servers": [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfigDocument {
    pub servers: Vec<ServerDescriptorSpec>,
}

/// Immutable, validated descriptor used for routing. Two descriptors with
/// identical `command` are the same server instance even under different
/// extensions — routing is keyed by extension, identity is keyed by
/// `LanguageServerConfig` equality in the registry.
#[derive(Debug, Clone)]
pub struct ServerDescriptor {
    pub language: String,
    pub extensions: Vec<String>,
    pub command: Vec<String>,
    pub root_dir: PathBuf,
    pub restart_interval: Option<Duration>,
    pub init_options: Option<JsonValue>,
    pub env: Option<HashMap<String, String>>,
}

impl ServerDescriptor {
    /// Build from a parsed spec entry, assigning it a language id derived
    /// from its first extension (callers may override via
    /// [`crate::registry::LanguageServerRegistry::register`]'s explicit key).
    pub fn from_spec(spec: ServerDescriptorSpec) -> Self {
        let language = spec
            .extensions
            .first()
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());
        // The minimum effective restart interval is 0.1 minutes; anything
        // smaller is clamped so a misconfigured "0" doesn't restart the
        // server on every acquisition.
        let restart_interval = spec
            .restart_interval_minutes
            .map(|m| Duration::from_secs_f64((m.max(0.1)) * 60.0));
        Self {
            language,
            extensions: spec.extensions,
            command: spec.command,
            root_dir: spec.root_dir,
            restart_interval,
            init_options: spec.init_options,
            env: spec.env,
        }
    }
}
