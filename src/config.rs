//! Ingestion configuration.
//!
//! Configuration is plain serde data. Every field has a default, so an empty
//! document (`{}`) is a valid configuration.
//!
//! ```json
//! {
//!   "max_nesting_depth": 4,
//!   "namespace_mappings": { "web": "http://java.sun.com/xml/ns/javaee" },
//!   "extension_hints": { "bpel": "BpelDocument" }
//! }
//! ```

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

/// Default bound on archive-in-archive recursion.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 8;

/// Default audit creator recorded on new artifacts.
pub const DEFAULT_CREATOR: &str = "artificer";

/// Settings shared by detection, derivation and expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Maximum depth of nested archive expansion. The top-level archive is depth 1.
    pub max_nesting_depth: usize,
    /// Root directory for work directories. System temp dir when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
    /// Extra XPath prefix to namespace URI mappings.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub namespace_mappings: IndexMap<String, String>,
    /// File extension (without dot) to extended artifact type name.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub extension_hints: IndexMap<String, String>,
    /// Whether archives found inside archives are expanded.
    pub expand_nested_archives: bool,
    /// Audit `created_by` recorded on artifacts created during ingestion.
    pub default_creator: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            temp_dir: None,
            namespace_mappings: IndexMap::new(),
            extension_hints: IndexMap::new(),
            expand_nested_archives: true,
            default_creator: DEFAULT_CREATOR.to_string(),
        }
    }
}

impl IngestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespace_mappings.insert(prefix.into(), uri.into());
        self
    }

    pub fn with_extension_hint(
        mut self,
        extension: impl Into<String>,
        extended_type: impl Into<String>,
    ) -> Self {
        self.extension_hints
            .insert(extension.into().to_ascii_lowercase(), extended_type.into());
        self
    }

    /// Parse a JSON configuration document.
    pub fn from_json_str(input: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(input)
            .map_err(|e| IngestError::config(format!("Invalid JSON configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML configuration document.
    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(input)
            .map_err(|e| IngestError::config(format!("Invalid YAML configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, choosing the format by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("json") => Self::from_json_str(&text),
            #[cfg(feature = "yaml")]
            Some("yaml" | "yml") => Self::from_yaml_str(&text),
            _ => Err(IngestError::config(format!(
                "Unsupported configuration file: {}",
                path.display()
            ))),
        }
    }

    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.max_nesting_depth == 0 {
            return Err(IngestError::config("max_nesting_depth must be at least 1"));
        }
        if self.default_creator.trim().is_empty() {
            return Err(IngestError::config("default_creator must not be empty"));
        }
        Ok(())
    }

    /// Extended type hinted for a file extension, if configured.
    pub fn extension_hint(&self, extension: &str) -> Option<&str> {
        self.extension_hints
            .get(&extension.to_ascii_lowercase())
            .map(String::as_str)
    }
}
