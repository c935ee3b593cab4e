//! Hand-written summaries that replace extracted ones
//!
//! A docs directory holds `overrides.json`, a map from operation name to a markdown
//! file in the same directory. Names are either `<providerKey>.<qualifiedName>` or a
//! bare qualified name.

use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Manifest file name inside the docs directory
pub const OVERRIDES_MANIFEST: &str = "overrides.json";

#[derive(Debug, Clone, Default)]
pub struct SummaryOverrides {
    summaries: HashMap<String, String>,
}

impl SummaryOverrides {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load overrides from `docs_dir`. A missing or unreadable manifest yields no
    /// overrides; entries whose markdown file is missing are ignored.
    pub fn load(docs_dir: &Path) -> Self {
        let manifest_path = docs_dir.join(OVERRIDES_MANIFEST);
        if !manifest_path.exists() {
            debug!("No summary overrides at {}", manifest_path.display());
            return Self::empty();
        }

        let manifest: HashMap<String, String> = match std::fs::read_to_string(&manifest_path)
            .map_err(|e| e.to_string())
            .and_then(|content| serde_json::from_str(&content).map_err(|e| e.to_string()))
        {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("Failed to load summary overrides from {}: {}", manifest_path.display(), e);
                return Self::empty();
            }
        };

        let mut summaries = HashMap::new();
        for (name, file) in manifest {
            let md_path = docs_dir.join(&file);
            match std::fs::read_to_string(&md_path) {
                Ok(text) => {
                    summaries.insert(name, text);
                }
                Err(e) => debug!("Skipping override '{}': {}: {}", name, md_path.display(), e),
            }
        }

        info!("Loaded {} summary overrides from {}", summaries.len(), docs_dir.display());
        Self { summaries }
    }

    pub fn insert(&mut self, name: impl Into<String>, summary: impl Into<String>) {
        self.summaries.insert(name.into(), summary.into());
    }

    /// Override for an operation, provider-qualified name first
    pub fn lookup(&self, provider_key: &str, qualified_name: &str) -> Option<&str> {
        self.summaries
            .get(&format!("{}.{}", provider_key, qualified_name))
            .or_else(|| self.summaries.get(qualified_name))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_manifest_and_markdown() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(OVERRIDES_MANIFEST),
            r#"{"chronicle.search_udm": "search.md", "list_rules": "rules.md", "gone": "missing.md"}"#,
        )
        .unwrap();
        fs::write(dir.path().join("search.md"), "# Search UDM events").unwrap();
        fs::write(dir.path().join("rules.md"), "List detection rules").unwrap();

        let overrides = SummaryOverrides::load(dir.path());
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides.lookup("chronicle", "search_udm"), Some("# Search UDM events"));
        assert_eq!(overrides.lookup("anything", "list_rules"), Some("List detection rules"));
        assert_eq!(overrides.lookup("chronicle", "gone"), None);
    }

    #[test]
    fn test_invalid_manifest_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(OVERRIDES_MANIFEST), "not json").unwrap();
        assert!(SummaryOverrides::load(dir.path()).is_empty());
        assert!(SummaryOverrides::load(&dir.path().join("absent")).is_empty());
    }
}
