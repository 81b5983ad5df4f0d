//! Extension-based routing: which registered [`ServerDescriptor`] handles a
//! given file. Distinct from [`crate::registry::LanguageServerRegistry::supports`],
//! which answers "can the already-running server for this language do X".

use std::path::Path;

use crate::config::ServerDescriptor;

/// A table of registered descriptors, routed first-match-wins by file
/// extension. Built once from a parsed [`crate::config::ServerConfigDocument`]
/// and handed to the registry/session layer for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    descriptors: Vec<ServerDescriptor>,
}

impl RoutingTable {
    pub fn new(descriptors: Vec<ServerDescriptor>) -> Self {
        Self { descriptors }
    }

    /// The descriptor whose `extensions` list contains `path`'s extension,
    /// first registered wins on overlap. `None` if no descriptor claims it.
    pub fn route(&self, path: &Path) -> Option<&ServerDescriptor> {
        let extension = crate::uri::extension_of(path);
        if extension.is_empty() {
            return None;
        }
        self.descriptors
            .iter()
            .find(|d| d.extensions.iter().any(|e| e.eq_ignore_ascii_case(&extension)))
    }

    pub fn language_for(&self, path: &Path) -> Option<&str> {
        self.route(path).map(|d| d.language.as_str())
    }

    pub fn descriptors(&self) -> &[ServerDescriptor] {
        &self.descriptors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn descriptor(language: &str, extensions: &[&str]) -> ServerDescriptor {
        ServerDescriptor {
            language: language.to_string(),
            extensions: extensions.iter().map(|s| s.to_string()).collect(),
            command: vec![language.to_string()],
            root_dir: PathBuf::from("."),
            restart_interval: None,
            init_options: None,
            env: None,
        }
    }

    #[test]
    fn routes_by_extension_case_insensitively() {
        let table = RoutingTable::new(vec![descriptor("rust", &["rs"])]);
        assert_eq!(
            table.language_for(&PathBuf::from("src/main.RS")),
            Some("rust")
        );
    }

    #[test]
    fn first_registered_descriptor_wins_on_overlap() {
        let table = RoutingTable::new(vec![
            descriptor("typescript", &["ts"]),
            descriptor("deno", &["ts"]),
        ]);
        assert_eq!(table.language_for(&PathBuf::from("a.ts")), Some("typescript"));
    }

    #[test]
    fn unregistered_extension_routes_to_nothing() {
        let table = RoutingTable::new(vec![descriptor("rust", &["rs"])]);
        assert!(table.route(&PathBuf::from("a.py")).is_none());
    }

    #[test]
    fn extensionless_path_routes_to_nothing() {
        let table = RoutingTable::new(vec![descriptor("rust", &["rs"])]);
        assert!(table.route(&PathBuf::from("Makefile")).is_none());
    }
}
